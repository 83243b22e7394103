pub mod fuzzy;
pub mod grid;
pub mod layout;
pub mod metadata;
pub mod perc_cell;
pub mod plot;
pub mod value_cell;

pub use layout::classify_layout;
pub use metadata::{extract_header_metadata, extract_metric_metadata, field_size_laterality_from_plot};
pub use perc_cell::recognize_perc_cell;
pub use plot::{extract_all_plots, ExtractedPlots};
pub use value_cell::{recognize_value_cell, ValueKind};
