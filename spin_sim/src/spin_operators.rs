use num_complex::Complex64;
use crate::matmath::{Vector,Matrix};

/// Right-handed rotation about the unit vector `n` by `angle` radians (Rodrigues form)
pub fn axis_rotation(n:&Vector,angle:f64) -> Matrix {
    let mut result = Matrix::zeros();
    let cosphi = angle.cos();
    let onemcosphi = 1.0 - cosphi;
    let sinphi = angle.sin();
    let nxsinphi = n.x*sinphi;
    let nysinphi = n.y*sinphi;
    let nzsinphi = n.z*sinphi;
    let nxnx = n.x*n.x;let nyny = n.y*n.y;let nznz = n.z*n.z;
    let nxny = n.x*n.y;let nxnz = n.x*n.z;let nynz = n.y*n.z;
    result.a.x = nxnx*onemcosphi + cosphi;
    result.a.y = nxny*onemcosphi - nzsinphi;
    result.a.z = nxnz*onemcosphi + nysinphi;
    result.b.x = nxny*onemcosphi + nzsinphi;
    result.b.y = nyny*onemcosphi + cosphi;
    result.b.z = nynz*onemcosphi - nxsinphi;
    result.c.x = nxnz*onemcosphi - nysinphi;
    result.c.y = nynz*onemcosphi + nxsinphi;
    result.c.z = nznz*onemcosphi + cosphi;
    return result;
}

/// Instantaneous excitation: rotation by `flip` about the transverse axis at angle `phase` from x
pub fn rf_rotation(flip:f64,phase:f64) -> Matrix {
    if flip == 0.0 {
        return Matrix::identity();
    }
    let axis = Vector::new(phase.cos(),phase.sin(),0.0);
    axis_rotation(&axis,flip)
}

/// (E1, E2) decay factors over `tau` seconds
pub fn relaxation_factors(t1:f64,t2:f64,tau:f64) -> (f64,f64) {
    ((-tau/t1).exp(),(-tau/t2).exp())
}

/// Exact free evolution over one interval: Mz recovers toward `m0`,
/// Mxy decays by `e2` while precessing by `phase` radians
pub fn relax_precess(mag:Vector,e1:f64,e2:f64,phase:f64,m0:f64) -> Vector {
    let mut m = mag;
    m.z = m.z + (m0 - m.z)*(1.0 - e1);
    m.set_transverse(mag.transverse()*Complex64::from_polar(e2,phase));
    return m;
}

/// Longitudinal recovery only, transverse magnetization is spoiled
pub fn relax_spoil(mag:Vector,e1:f64,m0:f64) -> Vector {
    Vector::new(0.0,0.0,mag.z + (m0 - mag.z)*(1.0 - e1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2,PI};
    use approx::assert_abs_diff_eq;
    use crate::matmath::Axis;

    #[test]
    fn ninety_about_x_tips_z_onto_negative_y() {
        let m = rf_rotation(FRAC_PI_2,0.0)*Vector::unit(Axis::Z);
        assert_abs_diff_eq!(m,Vector::new(0.0,-1.0,0.0),epsilon = 1e-12);
    }

    #[test]
    fn ninety_about_y_tips_z_onto_x() {
        let m = rf_rotation(FRAC_PI_2,FRAC_PI_2)*Vector::unit(Axis::Z);
        assert_abs_diff_eq!(m,Vector::new(1.0,0.0,0.0),epsilon = 1e-12);
    }

    #[test]
    fn rotations_are_orthonormal() {
        let r = rf_rotation(1.234,0.567);
        assert_abs_diff_eq!(r*r.transpose(),Matrix::identity(),epsilon = 1e-12);
        assert_abs_diff_eq!(r.determinant(),1.0,epsilon = 1e-12);
    }

    #[test]
    fn z_rotation_matches_complex_phase() {
        let m = Vector::new(0.6,0.2,0.1);
        let r = axis_rotation(&Vector::unit(Axis::Z),0.7)*m;
        let c = relax_precess(m,1.0,1.0,0.7,0.1);
        assert_abs_diff_eq!(r,c,epsilon = 1e-12);
    }

    #[test]
    fn zero_flip_is_identity() {
        assert_eq!(rf_rotation(0.0,PI),Matrix::identity());
    }

    #[test]
    fn relaxation_approaches_equilibrium() {
        let (e1,e2) = relaxation_factors(1.0,0.1,50.0);
        let m = relax_precess(Vector::new(1.0,0.0,-1.0),e1,e2,0.3,0.8);
        assert_abs_diff_eq!(m,Vector::equilibrium(0.8),epsilon = 1e-12);
    }

    #[test]
    fn spoiling_clears_transverse() {
        let m = relax_spoil(Vector::new(0.5,0.5,0.0),0.5,1.0);
        assert_abs_diff_eq!(m,Vector::new(0.0,0.0,0.5),epsilon = 1e-12);
    }
}
