pub use gml::{read_gml, GmlError};
pub use source::{GraphDirectory, GraphSource};
pub use topology::Graph;

mod gml;
mod source;
mod topology;
