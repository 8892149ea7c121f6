use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reasons a [`SimConfig`](crate::SimConfig) is rejected.
///
/// Only configuration can fail. Once a simulation is built every per-frame stage is
/// infallible: spawn overflow is dropped and degenerate particle pairs are skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    /// The bounding box leaves no room once inset by the particle radius.
    #[error("bounding box {width}x{height} cannot hold particles of radius {radius}")]
    DomainTooSmall { width: f64, height: f64, radius: f64 },

    /// Neighbour lookups only scan the 3x3 block of cells around a particle.
    #[error("interaction radius {radius} exceeds grid cell size {cell_size}")]
    RadiusExceedsCell { radius: f64, cell_size: f64 },

    #[error("contour step {step} gives {columns}x{rows} lattice cells, more than {max}")]
    LatticeTooLarge {
        step: f64,
        columns: f64,
        rows: f64,
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = ConfigError::OutOfRange {
            name: "drag",
            value: 1.5,
            min: 0.0,
            max: 1.0,
        };
        let msg = format!("{e}");
        assert!(msg.contains("drag"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn domain_error_names_radius() {
        let e = ConfigError::DomainTooSmall {
            width: 4.0,
            height: 100.0,
            radius: 5.5,
        };
        assert!(e.to_string().contains("radius 5.5"));
    }

    #[test]
    fn cell_error_names_both_sizes() {
        let e = ConfigError::RadiusExceedsCell {
            radius: 30.0,
            cell_size: 20.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("30") && msg.contains("20"));
    }
}
