//! Reflex Protocol - Traffic Morphing Profiles
//!
//! Weighted-random samplers for target packet sizes and inter-packet delays,
//! plus the process-wide registry of built-in cover profiles. A session with
//! a profile attached pads its Data frames to sampled sizes and sleeps for
//! sampled delays after each write, so the wire-level size and timing
//! distributions match the cover application instead of the tunneled stream.

mod profile;
pub mod registry;

pub use profile::{DelayBucket, SizeBucket, TrafficProfile};
