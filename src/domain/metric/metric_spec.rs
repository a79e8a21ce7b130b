/// Store field a metric's samples are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Watts,
    Percent,
}

impl ValueKind {
    pub const ALL: [ValueKind; 2] = [ValueKind::Watts, ValueKind::Percent];

    pub fn field(self) -> &'static str {
        match self {
            ValueKind::Watts => "value_watts",
            ValueKind::Percent => "value_percent",
        }
    }
}

/// One measurable quantity exposed as `/api/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub value_kind: ValueKind,
}

const fn watts(name: &'static str) -> MetricSpec {
    MetricSpec { name, value_kind: ValueKind::Watts }
}

const fn percent(name: &'static str) -> MetricSpec {
    MetricSpec { name, value_kind: ValueKind::Percent }
}

/// Every metric served by the API. Names double as the `metric` tag value.
pub static METRIC_SPECS: [MetricSpec; 10] = [
    watts("additional_feed_in_power"),
    watts("battery_power"),
    watts("grid_power"),
    watts("house_consumption"),
    watts("pv_power"),
    watts("wallbox_consumption"),
    watts("wallbox_solar_consumption"),
    percent("battery_soc"),
    percent("self_consumption"),
    percent("self_sufficiency"),
];

pub fn find_metric(name: &str) -> Option<&'static MetricSpec> {
    METRIC_SPECS.iter().find(|spec| spec.name == name)
}
