//! Metrics definitions for the function registry.

use shared::metrics_defs::{MetricDef, MetricType};

pub const POPULATE_CALLS: MetricDef = MetricDef {
    name: "registry.populate",
    metric_type: MetricType::Counter,
    description: "Number of populate calls applied to the registry",
};

pub const SEED_FAILURES: MetricDef = MetricDef {
    name: "registry.seed.failures",
    metric_type: MetricType::Counter,
    description: "Number of tenants that could not be loaded while seeding",
};

pub const SEED_DURATION: MetricDef = MetricDef {
    name: "registry.seed.duration",
    metric_type: MetricType::Histogram,
    description: "Time to seed the registry from the function store in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[POPULATE_CALLS, SEED_FAILURES, SEED_DURATION];
