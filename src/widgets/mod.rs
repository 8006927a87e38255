//! UI Widgets - modular, reusable UI components
//!
//! Each widget is self-contained and communicates via EventBus

pub mod activity_plot;
pub mod capture_list;
pub mod frame_view;
pub mod occurrence_panel;
pub mod status;

pub use activity_plot::{activity_plot, ActivityPlotConfig};
pub use capture_list::capture_list;
pub use frame_view::FrameView;
pub use occurrence_panel::{occurrence_panel, OccurrenceCache};
pub use status::StatusBar;
