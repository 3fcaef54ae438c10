use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sonic_core::Point;

use crate::config::LayoutConfig;

/// Fuente del ángulo de cada punto no-semilla. El ángulo no tiene
/// significado; sólo dispersa los puntos.
pub trait AngleSource {
    /// `index` es la posición del punto entre los `total` no-semilla.
    fn angle(&mut self, index: usize, total: usize) -> f64;
}

/// Ángulos aleatorios reproducibles a partir de una semilla.
#[derive(Debug, Clone)]
pub struct SeededAngles {
    rng: StdRng,
}

impl SeededAngles {
    pub fn new(seed: u64) -> Self {
        SeededAngles {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl AngleSource for SeededAngles {
    fn angle(&mut self, _index: usize, _total: usize) -> f64 {
        self.rng.random_range(0.0..TAU)
    }
}

/// Ángulos del generador del hilo; distintos en cada ejecución.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngAngles;

impl AngleSource for ThreadRngAngles {
    fn angle(&mut self, _index: usize, _total: usize) -> f64 {
        rand::rng().random_range(0.0..TAU)
    }
}

/// `2π · index / total`, sin aleatoriedad.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenlySpacedAngles;

impl AngleSource for EvenlySpacedAngles {
    fn angle(&mut self, index: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        TAU * index as f64 / total as f64
    }
}

/// Convierte puntuaciones en coordenadas alrededor del centro.
#[derive(Debug, Clone)]
pub struct SpatialLayoutEngine {
    config: LayoutConfig,
}

impl SpatialLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        SpatialLayoutEngine { config }
    }

    pub fn center(&self) -> Point {
        self.config.center
    }

    /// `(100 - score) · scale_factor`, acotada a `max_distance`.
    pub fn distance(&self, score: f64) -> f64 {
        ((100.0 - score).max(0.0) * self.config.scale_factor).min(self.config.max_distance)
    }

    pub fn place(&self, score: f64, angle: f64) -> Point {
        let distance = self.distance(score);
        let center = self.config.center;
        Point::new(center.x + distance * angle.cos(), center.y + distance * angle.sin())
    }

    /// Posiciones en el mismo orden que `rows`. La semilla va al centro y no
    /// consume ángulo.
    pub fn layout(&self, rows: &[(f64, bool)], angles: &mut dyn AngleSource) -> Vec<Point> {
        let total = rows.iter().filter(|(_, seed)| !seed).count();
        let mut index = 0;

        rows.iter()
            .map(|&(score, is_seed)| {
                if is_seed {
                    return self.config.center;
                }
                let angle = angles.angle(index, total);
                index += 1;
                self.place(score, angle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SpatialLayoutEngine {
        SpatialLayoutEngine::new(LayoutConfig::default())
    }

    #[test]
    fn seed_is_pinned_to_center() {
        let points = engine().layout(&[(100.0, true), (100.0, false)], &mut ThreadRngAngles);
        assert_eq!(points[0], Point::new(50.0, 50.0));
        assert!(points[1].distance_to(&Point::new(50.0, 50.0)) < 1e-12);
    }

    #[test]
    fn evenly_spaced_coordinates_are_exact() {
        let e = engine();
        let points = e.layout(&[(100.0, true), (50.0, false), (0.0, false)], &mut EvenlySpacedAngles);
        // 50 puntos → distancia 20, ángulo 0
        assert!((points[1].x - 70.0).abs() < 1e-12);
        assert!((points[1].y - 50.0).abs() < 1e-12);
        // 0 puntos → distancia 40, ángulo π
        assert!((points[2].x - 10.0).abs() < 1e-9);
        assert!((points[2].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn seeded_angles_are_reproducible() {
        let rows = [(100.0, true), (80.0, false), (60.0, false), (10.0, false)];
        let a = engine().layout(&rows, &mut SeededAngles::new(7));
        let b = engine().layout(&rows, &mut SeededAngles::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn distance_shrinks_with_score_and_is_capped() {
        let cfg = LayoutConfig {
            scale_factor: 4.0,
            ..Default::default()
        };
        let e = SpatialLayoutEngine::new(cfg);
        assert_eq!(e.distance(100.0), 0.0);
        assert_eq!(e.distance(95.0), 20.0);
        assert_eq!(e.distance(0.0), 45.0);
        assert!(e.distance(90.0) <= e.distance(80.0));
    }
}
