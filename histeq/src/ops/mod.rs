mod backend_selection;
mod histogram_equalization;

pub use backend_selection::{Backend, select_backend};
pub use histogram_equalization::HistogramEqualization;
