// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! gemm_kernel = "blocked"
//! enable_profiling = true
//! ```

use crate::GraphError;
use kernels::GemmKernel;
use std::path::Path;

/// Configuration for one inference run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// GEMM kernel name: `"inner-product"`, `"outer-product"`,
    /// `"row-wise"`, `"col-wise"`, `"blocked"`, `"simd-256"`,
    /// `"simd-512"`.
    pub gemm_kernel: String,
    /// Whether to collect and print per-node timing metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraphError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, GraphError> {
        toml::from_str(toml_str)
            .map_err(|e| GraphError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, GraphError> {
        toml::to_string_pretty(self)
            .map_err(|e| GraphError::Config(format!("TOML serialise error: {e}")))
    }

    /// Resolves the configured GEMM kernel.
    pub fn resolve_gemm_kernel(&self) -> Result<GemmKernel, GraphError> {
        self.gemm_kernel
            .parse()
            .map_err(|e| GraphError::Config(format!("invalid gemm kernel: {e}")))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gemm_kernel: GemmKernel::default().name().to_string(),
            enable_profiling: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.gemm_kernel, "inner-product");
        assert!(c.enable_profiling);
        assert_eq!(c.resolve_gemm_kernel().unwrap(), GemmKernel::InnerProduct);
    }

    #[test]
    fn test_from_toml() {
        let c = RuntimeConfig::from_toml(
            r#"
gemm_kernel = "simd-256"
enable_profiling = false
"#,
        )
        .unwrap();
        assert_eq!(c.resolve_gemm_kernel().unwrap(), GemmKernel::Simd256);
        assert!(!c.enable_profiling);
    }

    #[test]
    fn test_profiling_defaults_on() {
        let c = RuntimeConfig::from_toml("gemm_kernel = \"blocked\"").unwrap();
        assert!(c.enable_profiling);
    }

    #[test]
    fn test_toml_roundtrip() {
        let c = RuntimeConfig::default();
        let back = RuntimeConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back.gemm_kernel, c.gemm_kernel);
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let c = RuntimeConfig {
            gemm_kernel: "bogus".into(),
            enable_profiling: true,
        };
        assert!(matches!(
            c.resolve_gemm_kernel(),
            Err(GraphError::Config(_))
        ));
    }
}
