//! Métriques de poids: aire de triangle et aire d'anneau, planes ou sphériques
//!
//! Les coordonnées sphériques sont en degrés (longitude, latitude). Les aires
//! sphériques sont des excès sphériques en stéradians.

use std::f64::consts::{FRAC_PI_4, TAU};

use geo::Coord;

const RADIANS: f64 = std::f64::consts::PI / 180.0;

/// Système de calcul des poids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightSystem {
    /// Excès sphérique (coordonnées géographiques)
    Spherical,
    /// Aire plane
    Planar,
}

impl WeightSystem {
    /// Nom utilisé dans les paramètres et en-têtes (`sphericalArea`, ...)
    pub fn name(self) -> &'static str {
        match self {
            WeightSystem::Spherical => "spherical",
            WeightSystem::Planar => "planar",
        }
    }

    /// Poids d'un sommet: aire du triangle formé avec ses deux voisins
    pub fn triangle_area(self, triangle: [Coord; 3]) -> f64 {
        match self {
            WeightSystem::Spherical => spherical_triangle_area(triangle),
            WeightSystem::Planar => planar_triangle_area(triangle),
        }
    }

    /// Aire d'un anneau fermé
    ///
    /// En sphérique, le sens compte: un extérieur horaire (règle de la main
    /// droite) donne la petite aire; `interior` inverse l'orientation attendue.
    pub fn ring_area(self, ring: &[Coord], interior: bool) -> f64 {
        match self {
            WeightSystem::Spherical => spherical_ring_area(ring, interior),
            WeightSystem::Planar => planar_ring_area(ring),
        }
    }
}

/// Aire plane d'un triangle
pub fn planar_triangle_area([a, b, c]: [Coord; 3]) -> f64 {
    ((a.x - c.x) * (b.y - a.y) - (a.x - b.x) * (c.y - a.y)).abs() / 2.0
}

/// Aire plane d'un anneau (formule du lacet)
pub fn planar_ring_area(ring: &[Coord]) -> f64 {
    let Some(&last) = ring.last() else {
        return 0.0;
    };
    let mut previous = last;
    let mut area = 0.0;
    for &current in ring {
        area += previous.x * current.y - previous.y * current.x;
        previous = current;
    }
    area.abs() / 2.0
}

/// Excès sphérique d'un triangle
pub fn spherical_triangle_area(triangle: [Coord; 3]) -> f64 {
    half_area(&triangle, false).abs() * 2.0
}

/// Aire sphérique d'un anneau
pub fn spherical_ring_area(ring: &[Coord], interior: bool) -> f64 {
    let mut sum = half_area(ring, true);
    if interior {
        sum = -sum;
    }
    (if sum < 0.0 { TAU + sum } else { sum }) * 2.0
}

/// Somme des demi-excès des triangles (pôle sud, point précédent, point courant)
///
/// Formule dérivée du théorème de Cagnoli (Todhunter, Spherical Trig., §103).
/// Pour un anneau fermé, le premier point sert d'origine; sinon le dernier.
fn half_area(ring: &[Coord], closed: bool) -> f64 {
    let n = ring.len();
    if n == 0 {
        return 0.0;
    }
    let (mut i, start) = if closed { (1, ring[0]) } else { (0, ring[n - 1]) };

    let mut lambda1 = start.x * RADIANS;
    let phi1 = start.y * RADIANS / 2.0 + FRAC_PI_4;
    let mut cos_phi1 = phi1.cos();
    let mut sin_phi1 = phi1.sin();
    let mut sum = 0.0;

    while i < n {
        let point = ring[i];
        let lambda0 = lambda1;
        lambda1 = point.x * RADIANS;
        let phi1 = point.y * RADIANS / 2.0 + FRAC_PI_4;
        let (cos_phi0, sin_phi0) = (cos_phi1, sin_phi1);
        cos_phi1 = phi1.cos();
        sin_phi1 = phi1.sin();

        let d_lambda = lambda1 - lambda0;
        let sd_lambda = if d_lambda >= 0.0 { 1.0 } else { -1.0 };
        let ad_lambda = sd_lambda * d_lambda;
        let k = sin_phi0 * sin_phi1;
        let u = cos_phi0 * cos_phi1 + k * ad_lambda.cos();
        let v = k * sd_lambda * ad_lambda.sin();
        sum += v.atan2(u);
        i += 1;
    }

    sum
}
