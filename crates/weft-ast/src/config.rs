//! Compilation configuration.

/// How dynamic indices are kept in bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundsCheckMode {
    /// Clamp every dynamic index to the last valid element.
    #[default]
    Clamp,
    /// The platform provides robust buffer access; insert nothing.
    Robustness,
}

/// Device limits that shader attributes are validated against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_compute_workgroup_size_x: u32,
    pub max_compute_workgroup_size_y: u32,
    pub max_compute_workgroup_size_z: u32,
    pub max_compute_invocations_per_workgroup: u32,
    pub max_bind_groups: u32,
    pub max_bindings_per_bind_group: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_compute_workgroup_size_x: 256,
            max_compute_workgroup_size_y: 256,
            max_compute_workgroup_size_z: 64,
            max_compute_invocations_per_workgroup: 256,
            max_bind_groups: 4,
            max_bindings_per_bind_group: 1000,
        }
    }
}

impl Limits {
    pub fn max_workgroup_size(&self) -> [u32; 3] {
        [
            self.max_compute_workgroup_size_x,
            self.max_compute_workgroup_size_y,
            self.max_compute_workgroup_size_z,
        ]
    }
}

/// Optional language features.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Features {
    pub shader_f16: bool,
}

/// Settings fixed for the lifetime of a shader module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    pub bounds_check: BoundsCheckMode,
    pub dump_ast_between_passes: bool,
    pub dump_ast_at_end: bool,
    pub log_phase_times: bool,
    pub limits: Limits,
    pub features: Features,
    /// Upper bound on diagnostics a single pass collects before giving up.
    pub max_errors: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bounds_check: BoundsCheckMode::default(),
            dump_ast_between_passes: false,
            dump_ast_at_end: false,
            log_phase_times: false,
            limits: Limits::default(),
            features: Features::default(),
            max_errors: 32,
        }
    }
}

impl Configuration {
    pub fn with_bounds_check(mut self, mode: BoundsCheckMode) -> Self {
        self.bounds_check = mode;
        self
    }

    /// Enables both the per-pass and the final AST dump.
    pub fn with_ast_dumps(mut self, enabled: bool) -> Self {
        self.dump_ast_between_passes = enabled;
        self.dump_ast_at_end = enabled;
        self
    }

    pub fn with_phase_times(mut self, enabled: bool) -> Self {
        self.log_phase_times = enabled;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_f16(mut self, enabled: bool) -> Self {
        self.features.shader_f16 = enabled;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors.max(1);
        self
    }
}
