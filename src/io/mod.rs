//! Visualization output.
//!
//! State histories are exported as VTU snapshots plus a ParaView `.pvd`
//! collection. Nothing in this module mutates the data it writes.

mod vtk;

pub use vtk::{VtkError, export_state, series_path, write_pvd, write_vtu};
