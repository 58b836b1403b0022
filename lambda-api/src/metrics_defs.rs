//! Metrics definitions for the fake Lambda API.

use shared::metrics_defs::{MetricDef, MetricType};

pub const LIST_FUNCTIONS_REQUESTS: MetricDef = MetricDef {
    name: "requests.list_functions",
    metric_type: MetricType::Counter,
    description: "Number of ListFunctions requests served",
};

pub const UNSUPPORTED_REQUESTS: MetricDef = MetricDef {
    name: "requests.unsupported",
    metric_type: MetricType::Counter,
    description: "Number of requests for unsupported methods or paths",
};

pub const ALL_METRICS: &[MetricDef] = &[LIST_FUNCTIONS_REQUESTS, UNSUPPORTED_REQUESTS];
