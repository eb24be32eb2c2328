//! Capture-target selection.
//!
//! The viewer can pin the stream to a specific window or display.  When
//! nothing is pinned, the bridge looks up the target application's window by
//! name, and as a last resort captures the whole screen.
//!
//! - [`target`] holds the selection state and turns it into an ordered
//!   fallback plan.
//! - [`listing`] parses the tab-separated output of the enumeration helpers
//!   into sorted, de-duplicated [`target::WindowInfo`] / [`target::DisplayInfo`]
//!   lists.

pub mod listing;
pub mod target;
