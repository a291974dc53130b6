// crates/fv_mesh/src/geometry.rs

//! 多面体几何计算
//!
//! 由节点坐标和面的节点列表计算面中心、面积矢量、单元中心与体积。
//! 多边形面以节点平均点为顶点剖分为三角形；单元以估计中心为顶点剖分为棱锥。

use fv_foundation::float::VSMALL;
use glam::DVec3;

/// 面几何：(面中心, 面积矢量)
pub fn face_centre_and_area(points: &[DVec3], face: &[usize]) -> (DVec3, DVec3) {
    let n = face.len();
    if n == 3 {
        let (p0, p1, p2) = (points[face[0]], points[face[1]], points[face[2]]);
        return ((p0 + p1 + p2) / 3.0, 0.5 * (p1 - p0).cross(p2 - p0));
    }

    let estimate = face.iter().map(|&p| points[p]).sum::<DVec3>() / n as f64;

    let mut sum_n = DVec3::ZERO;
    let mut sum_a = 0.0;
    let mut sum_ac = DVec3::ZERO;
    for i in 0..n {
        let this = points[face[i]];
        let next = points[face[(i + 1) % n]];
        let c = this + next + estimate;
        let tri_n = (next - this).cross(estimate - this);
        let a = tri_n.length();
        sum_n += tri_n;
        sum_a += a;
        sum_ac += a * c;
    }

    let centre = if sum_a < VSMALL {
        estimate
    } else {
        sum_ac / (3.0 * sum_a)
    };
    (centre, 0.5 * sum_n)
}

/// 单元几何：(单元中心, 单元体积)
///
/// `owner`/`neighbour` 给出每个面的两侧单元，面积矢量指向 neighbour。
pub fn cell_centres_and_volumes(
    n_cells: usize,
    owner: &[usize],
    neighbour: &[usize],
    face_centres: &[DVec3],
    face_areas: &[DVec3],
) -> (Vec<DVec3>, Vec<f64>) {
    // 以面中心平均作为棱锥顶点
    let mut estimate = vec![DVec3::ZERO; n_cells];
    let mut n_faces_per_cell = vec![0usize; n_cells];
    for (f, &o) in owner.iter().enumerate() {
        estimate[o] += face_centres[f];
        n_faces_per_cell[o] += 1;
    }
    for (f, &nb) in neighbour.iter().enumerate() {
        estimate[nb] += face_centres[f];
        n_faces_per_cell[nb] += 1;
    }
    for (e, &count) in estimate.iter_mut().zip(&n_faces_per_cell) {
        *e /= count.max(1) as f64;
    }

    let mut centres = vec![DVec3::ZERO; n_cells];
    let mut volumes = vec![0.0; n_cells];

    for (f, &o) in owner.iter().enumerate() {
        let pyr3 = face_areas[f].dot(face_centres[f] - estimate[o]).max(VSMALL);
        let pc = 0.75 * face_centres[f] + 0.25 * estimate[o];
        centres[o] += pyr3 * pc;
        volumes[o] += pyr3;
    }
    for (f, &nb) in neighbour.iter().enumerate() {
        let pyr3 = face_areas[f].dot(estimate[nb] - face_centres[f]).max(VSMALL);
        let pc = 0.75 * face_centres[f] + 0.25 * estimate[nb];
        centres[nb] += pyr3 * pc;
        volumes[nb] += pyr3;
    }

    for (c, v) in centres.iter_mut().zip(volumes.iter_mut()) {
        if *v > VSMALL {
            *c /= *v;
        }
        *v /= 3.0;
    }
    (centres, volumes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> (Vec<DVec3>, Vec<Vec<usize>>) {
        let points = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(1.0, 1.0, 1.0),
            DVec3::new(0.0, 1.0, 1.0),
        ];
        // 外法向
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        (points, faces)
    }

    #[test]
    fn test_quad_face() {
        let (points, faces) = unit_cube();
        let (c, s) = face_centre_and_area(&points, &faces[1]);
        assert!((c - DVec3::new(0.5, 0.5, 1.0)).length() < 1e-14);
        assert!((s - DVec3::Z).length() < 1e-14);
    }

    #[test]
    fn test_triangle_face() {
        let points = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        let (c, s) = face_centre_and_area(&points, &[0, 1, 2]);
        assert!((c - DVec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-14);
        assert!((s - 0.5 * DVec3::Z).length() < 1e-14);
    }

    #[test]
    fn test_cube_volume() {
        let (points, faces) = unit_cube();
        let (cf, sf): (Vec<_>, Vec<_>) = faces
            .iter()
            .map(|f| face_centre_and_area(&points, f))
            .unzip();
        let owner = vec![0; 6];
        let (c, v) = cell_centres_and_volumes(1, &owner, &[], &cf, &sf);
        assert!((v[0] - 1.0).abs() < 1e-14);
        assert!((c[0] - DVec3::splat(0.5)).length() < 1e-14);
    }
}
