//! The shared Wasmtime engine.
//!
//! One [`WasmEngine`] compiles the guest and backs every instance created
//! from it. Everything here is fixed at construction: fuel consumption and
//! the allocation strategy cannot change per store.

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine, InstanceAllocationStrategy, OptLevel, PoolingAllocationConfig};

use resvg_host_common::{EngineConfig, RuntimeConfig, RuntimeError};

/// Engine shared by the compiled guest and all of its instances.
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    settings: EngineConfig,
    fuel_metering: bool,
}

impl WasmEngine {
    /// Build an engine for `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the settings fail validation or Wasmtime
    /// rejects them.
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config
            .validate()
            .map_err(|e| RuntimeError::invalid_config(e.to_string()))?;

        let engine = Engine::new(&wasmtime_config(config))
            .map_err(|e| RuntimeError::invalid_config(format!("Wasmtime engine: {e:#}")))?;

        info!(
            fuel_metering = config.execution.fuel_metering,
            pooling = config.engine.pooling_allocator,
            optimize = config.engine.optimize,
            "Engine ready"
        );

        Ok(Self {
            engine: Arc::new(engine),
            settings: config.engine.clone(),
            fuel_metering: config.execution.fuel_metering,
        })
    }

    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.settings
    }

    /// Whether stores must be given fuel before the guest can run.
    pub fn is_fuel_metering(&self) -> bool {
        self.fuel_metering
    }

    pub fn is_pooling_enabled(&self) -> bool {
        self.settings.pooling_allocator
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("pooling", &self.settings.pooling_allocator)
            .field("fuel_metering", &self.fuel_metering)
            .finish_non_exhaustive()
    }
}

fn wasmtime_config(config: &RuntimeConfig) -> Config {
    let mut wasmtime = Config::new();
    wasmtime.consume_fuel(config.execution.fuel_metering);
    wasmtime.cranelift_opt_level(if config.engine.optimize {
        OptLevel::Speed
    } else {
        OptLevel::None
    });

    if config.engine.pooling_allocator {
        wasmtime.allocation_strategy(InstanceAllocationStrategy::Pooling(pool(&config.engine)));
    }
    wasmtime
}

/// One slot per concurrent render: a render needs one instance, one
/// memory and one table.
fn pool(settings: &EngineConfig) -> PoolingAllocationConfig {
    let slots = settings.max_instances;
    let mut pool = PoolingAllocationConfig::default();
    pool.total_core_instances(slots)
        .total_memories(slots)
        .total_tables(slots)
        .max_memory_size(settings.instance_memory_mb as usize * 1024 * 1024);
    pool
}
