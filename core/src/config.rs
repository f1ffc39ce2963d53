use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the assignment editor guards the "no work on an absent day" rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Availability check and writes share one IMMEDIATE transaction.
    #[default]
    Authoritative,
    /// Check first, then write row by row. Last write wins.
    Advisory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
    pub step_id: String,
    pub name: String,
}

/// The ordered production steps every item of a product type runs through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRoute {
    pub product_type: String,
    pub label: String,
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, Deserialize)]
struct RoutesFile {
    routes: Vec<ProductRoute>,
}

fn default_max_daily_assignments() -> u32 { 24 }
fn default_capacity_hours() -> f64 { 8.0 }
fn default_session_timeout_hours() -> i64 { 12 }
fn default_login_route() -> String { "/login".into() }
fn default_recent_search_limit() -> usize { 10 }
fn default_auto_certificate() -> bool { true }
fn default_certificate_prefix() -> String { "QC".into() }

#[derive(Debug, Clone, Deserialize)]
struct PlannerFile {
    #[serde(default)]
    enforcement: EnforcementMode,
    #[serde(default = "default_max_daily_assignments")]
    max_daily_assignments: u32,
    #[serde(default = "default_capacity_hours")]
    default_capacity_hours: f64,
    #[serde(default = "default_session_timeout_hours")]
    session_timeout_hours: i64,
    #[serde(default = "default_login_route")]
    login_route: String,
    #[serde(default = "default_recent_search_limit")]
    recent_search_limit: usize,
    #[serde(default = "default_auto_certificate")]
    auto_certificate: bool,
    #[serde(default = "default_certificate_prefix")]
    certificate_prefix: String,
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub enforcement: EnforcementMode,
    /// Assignment count above which an operator's day reads as overbooked.
    /// Advisory only; nothing refuses an assignment because of it.
    pub max_daily_assignments: u32,
    /// Hours assumed for operators registered without their own figure.
    pub default_capacity_hours: f64,
    /// Measured from session start, not from last activity.
    pub session_timeout_hours: i64,
    pub login_route: String,
    pub recent_search_limit: usize,
    pub auto_certificate: bool,
    pub certificate_prefix: String,
    pub routes: HashMap<String, ProductRoute>,
}

impl PlannerConfig {
    /// Load from the data/ directory.
    /// In tests, use PlannerConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let planner_path = format!("{data_dir}/planner/planner_config.json");
        let planner_content = std::fs::read_to_string(&planner_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {planner_path}: {e}"))?;
        let planner: PlannerFile = serde_json::from_str(&planner_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {planner_path}: {e}"))?;

        let routes_path = format!("{data_dir}/routes/production_routes.json");
        let routes_content = std::fs::read_to_string(&routes_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {routes_path}: {e}"))?;
        let routes_file: RoutesFile = serde_json::from_str(&routes_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {routes_path}: {e}"))?;

        let config = Self::from_parts(planner, routes_file.routes);
        config.validate()?;
        log::debug!(
            "Loaded planner config from {data_dir}: {} product routes",
            config.routes.len()
        );
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let planner = PlannerFile {
            enforcement: EnforcementMode::Authoritative,
            max_daily_assignments: default_max_daily_assignments(),
            default_capacity_hours: default_capacity_hours(),
            session_timeout_hours: default_session_timeout_hours(),
            login_route: default_login_route(),
            recent_search_limit: default_recent_search_limit(),
            auto_certificate: default_auto_certificate(),
            certificate_prefix: default_certificate_prefix(),
        };

        let routes = vec![
            ProductRoute {
                product_type: "pressure_sensor".into(),
                label: "Pressure Sensor".into(),
                steps: vec![
                    step("ps.assembly", "Assembly"),
                    step("ps.calibration", "Calibration"),
                    step("ps.leak_test", "Leak Test"),
                    step("ps.final_inspection", "Final Inspection"),
                ],
            },
            ProductRoute {
                product_type: "controller".into(),
                label: "Controller".into(),
                steps: vec![
                    step("ctl.pcb_mount", "PCB Mount"),
                    step("ctl.firmware", "Firmware Flash"),
                    step("ctl.burn_in", "Burn-in"),
                ],
            },
        ];

        Self::from_parts(planner, routes)
    }

    pub fn route(&self, product_type: &str) -> Option<&ProductRoute> {
        self.routes.get(product_type)
    }

    fn from_parts(planner: PlannerFile, routes: Vec<ProductRoute>) -> Self {
        Self {
            enforcement: planner.enforcement,
            max_daily_assignments: planner.max_daily_assignments,
            default_capacity_hours: planner.default_capacity_hours,
            session_timeout_hours: planner.session_timeout_hours,
            login_route: planner.login_route,
            recent_search_limit: planner.recent_search_limit,
            auto_certificate: planner.auto_certificate,
            certificate_prefix: planner.certificate_prefix,
            routes: routes
                .into_iter()
                .map(|r| (r.product_type.clone(), r))
                .collect(),
        }
    }

    /// Step ids are global keys in the database, so two routes may not
    /// share one, and a route needs at least one step.
    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for route in self.routes.values() {
            if route.steps.is_empty() {
                anyhow::bail!("Route '{}' has no steps", route.product_type);
            }
            for s in &route.steps {
                if !seen.insert(s.step_id.as_str()) {
                    anyhow::bail!("Step id '{}' is used more than once", s.step_id);
                }
            }
        }
        if !(0.0..=24.0).contains(&self.default_capacity_hours) {
            anyhow::bail!(
                "default_capacity_hours must be within 0..=24, got {}",
                self.default_capacity_hours
            );
        }
        Ok(())
    }
}

fn step(step_id: &str, name: &str) -> RouteStep {
    RouteStep {
        step_id: step_id.into(),
        name: name.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_routes_pass_validation() {
        let config = PlannerConfig::default_test();
        assert!(config.validate().is_ok());
        assert_eq!(config.route("controller").map(|r| r.steps.len()), Some(3));
    }

    #[test]
    fn duplicate_step_ids_are_rejected() {
        let mut config = PlannerConfig::default_test();
        let dup = ProductRoute {
            product_type: "clone".into(),
            label: "Clone".into(),
            steps: vec![step("ps.assembly", "Assembly")],
        };
        config.routes.insert("clone".into(), dup);
        assert!(config.validate().is_err());
    }
}
