use crate::trackers::byte::options::python::PyByteTrackOptions;
use crate::trackers::byte::python::PyByteTrackOutput;
use crate::trackers::byte::simple_api::python::PyByteTrack;
use crate::utils::linear_sum_assignment::python::linear_sum_assignment_py;
use pyo3::prelude::*;

#[pymodule]
#[pyo3(name = "bytetrack")]
fn bytetrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyByteTrackOptions>()?;
    m.add_class::<PyByteTrackOutput>()?;
    m.add_class::<PyByteTrack>()?;

    m.add_function(wrap_pyfunction!(linear_sum_assignment_py, m)?)?;
    Ok(())
}
