// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CpMap Geometry
//!
//! Planar and envelope geometry used to map wind-tunnel pressure taps onto
//! real buildings: polygon booleans via i_overlay, minimum-area bounding
//! rectangles, Delaunay triangulation, clipped Voronoi cells and plane
//! projection of 3D facade polygons.

pub mod delaunay;
pub mod error;
pub mod plane;
pub mod polygon;
pub mod rectangle;
pub mod voronoi;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use delaunay::{triangulate_points, Triangulation2D};
pub use error::{Error, Result};
pub use plane::{calculate_polygon_normal, polygon_area_3d, project_to_2d, project_to_2d_with_basis};
pub use polygon::{
    closest_point_on_contour, compute_signed_area, difference_2d, ensure_ccw, intersect_2d,
    point_in_contour, region_area,
};
pub use rectangle::{convex_hull, min_area_rectangle, Rectangle};
pub use voronoi::{clipped_voronoi_cells, VoronoiCell};
