use daisyworld_core::{AgentType, World, WorldConfig};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// Daisyworld exposed to Python charting and visualization front ends.
#[pyclass(name = "DaisyWorld")]
struct PyDaisyWorld {
    world: World,
}

fn agent_type(name: &str) -> PyResult<AgentType> {
    AgentType::from_name(name)
        .ok_or_else(|| PyValueError::new_err(format!("unknown agent type: {name}")))
}

#[pymethods]
impl PyDaisyWorld {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => WorldConfig::from_json_str(json)
                .map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => WorldConfig::default(),
        };
        let world = World::try_new(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { world })
    }

    fn step(&mut self) -> PyResult<()> {
        self.world
            .step()
            .map(|_| ())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    fn run(&mut self, steps: usize) -> PyResult<()> {
        self.world
            .run(steps)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Count of live agents of `name` ("patch", "white_daisy", "black_daisy").
    fn type_count(&self, name: &str) -> PyResult<usize> {
        Ok(self.world.type_count(agent_type(name)?))
    }

    fn mean_temperature(&self) -> f64 {
        self.world.mean_temperature()
    }

    #[getter]
    fn world_temperature(&self) -> f64 {
        self.world.world_temperature()
    }

    #[getter]
    fn time(&self) -> u64 {
        self.world.time()
    }

    fn metrics_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.world.collect_step_metrics())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    fn cells_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.world.cells())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    WorldConfig::default()
        .to_json_pretty()
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDaisyWorld>()?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    Ok(())
}
