//! Decoy HTTP response for failed handshakes.
//!
//! A probe that fails the handshake must see something indistinguishable
//! from an unrelated web server rejecting the request. The response below is
//! shape-equivalent to a stock nginx 403: same status line, same header set
//! with a live RFC1123 date, same 153-byte body.

use std::io;
use std::time::SystemTime;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The canned 403 body. Byte-for-byte the page nginx 1.18 serves.
const DECOY_BODY: &str = concat!(
    "<html>\r\n",
    "<head><title>403 Forbidden</title></head>\r\n",
    "<body>\r\n",
    "<center><h1>403 Forbidden</h1></center>\r\n",
    "<hr><center>nginx/1.18.0</center>\r\n",
    "</body>\r\n",
    "</html>\r\n",
);

/// Render the full decoy response with a current `Date:` header.
pub fn decoy_response() -> String {
    format!(
        "HTTP/1.1 403 Forbidden\r\n\
         Server: nginx\r\n\
         Date: {}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        httpdate::fmt_http_date(SystemTime::now()),
        DECOY_BODY.len(),
        DECOY_BODY,
    )
}

/// Write the decoy response and flush.
///
/// The connection is being abandoned either way, so callers typically ignore
/// the result.
pub async fn write_decoy<W>(w: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(decoy_response().as_bytes()).await?;
    w.flush().await
}
