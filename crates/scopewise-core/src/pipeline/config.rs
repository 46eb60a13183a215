/// Configuration for the declaration pass and its policies.
///
/// Everything is enabled by default. Disable individual behaviours by
/// setting their fields to `false`, or use `from_skip_list` with names.
#[derive(Debug, Clone)]
pub struct PassConfig {
    pub declare_variables: bool,
    /// Let declarations migrate into loop bodies.
    pub allow_pass_into_loops: bool,
    /// Mark declarations whose variable is assigned exactly once as final.
    pub mark_effectively_final: bool,
    /// Fold `name = value` into the declaration's initializer.
    pub fold_initializers: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            declare_variables: true,
            allow_pass_into_loops: true,
            mark_effectively_final: true,
            fold_initializers: true,
        }
    }
}

impl PassConfig {
    /// Create a config with everything enabled except those in the skip list.
    ///
    /// Recognised names:
    /// - `"declare-variables"`
    /// - `"pass-into-loops"`
    /// - `"final-modifiers"`
    /// - `"fold-initializers"`
    pub fn from_skip_list(skip: &[&str]) -> Self {
        let mut config = Self::default();
        for name in skip {
            match *name {
                "declare-variables" => config.declare_variables = false,
                "pass-into-loops" => config.allow_pass_into_loops = false,
                "final-modifiers" => config.mark_effectively_final = false,
                "fold-initializers" => config.fold_initializers = false,
                _ => {}
            }
        }
        config
    }
}
