use std::ops;
use std::fmt;
use approx::{AbsDiffEq, RelativeEq};
use num_complex::Complex64;
use serde::{Serialize, Deserialize};

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Vector{
    pub x:f64,
    pub y:f64,
    pub z:f64
}

impl Vector {
    /** Returns a unit vector along the supplied axis */
    pub fn unit(axis:Axis) -> Vector{
        return match axis {
            Axis::X => Vector{x:1.0,y:0.0,z:0.0},
            Axis::Y => Vector{x:0.0,y:1.0,z:0.0},
            Axis::Z => Vector{x:0.0,y:0.0,z:1.0},
        }
    }
    /** Returns a null vector where are fields are 0.0 */
    pub fn null() -> Vector{
        return Vector{x:0.0,y:0.0,z:0.0};
    }

    pub fn new(x:f64,y:f64,z:f64) -> Vector {
        return Vector{x,y,z};
    }

    /// longitudinal magnetization at thermal equilibrium
    pub fn equilibrium(m0:f64) -> Vector {
        return Vector{x:0.0,y:0.0,z:m0};
    }

    /// transverse component as mx + i*my
    pub fn transverse(&self) -> Complex64 {
        Complex64::new(self.x,self.y)
    }

    pub fn set_transverse(&mut self,mxy:Complex64) {
        self.x = mxy.re;
        self.y = mxy.im;
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// round every component through f32 storage
    pub fn to_single(&self) -> Vector {
        Vector::new(self.x as f32 as f64,self.y as f32 as f64,self.z as f32 as f64)
    }

    pub fn cross(&self,v:&Vector) -> Vector {
        Vector::new(
            self.y*v.z - self.z*v.y,
            self.z*v.x - self.x*v.z,
            self.x*v.y - self.y*v.x
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/** Vector addition */
impl ops::Add<Vector> for Vector {
    type Output = Vector;
    fn add(self, _rhs:Vector) -> Vector {
        return Vector::new(self.x + _rhs.x,self.y + _rhs.y,self.z + _rhs.z);
    }
}

impl ops::AddAssign<Vector> for Vector {
    fn add_assign(&mut self, _rhs:Vector) {
        self.x += _rhs.x;
        self.y += _rhs.y;
        self.z += _rhs.z;
    }
}

/** Vector subtraction */
impl ops::Sub<Vector> for Vector {
    type Output = Vector;
    fn sub(self, _rhs:Vector) -> Vector {
        return Vector::new(self.x - _rhs.x,self.y - _rhs.y,self.z - _rhs.z);
    }
}

/** Vector dot product */
impl ops::Mul<Vector> for Vector {
    type Output = f64;
    fn mul(self, _rhs:Vector) -> f64 {
        return self.x*_rhs.x + self.y*_rhs.y + self.z*_rhs.z;
    }
}

/** Vector-scalar multiplication */
impl ops::Mul<Vector> for f64 {
    type Output = Vector;
    fn mul(self,_rhs:Vector) -> Vector {
        return Vector::new(self*_rhs.x, self*_rhs.y, self*_rhs.z);
    }
}

impl ops::Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self,_rhs:f64) -> Vector {
        return Vector::new(self.x*_rhs, self.y*_rhs, self.z*_rhs);
    }
}

/// 3x3 matrix stored as rows
#[derive(Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Matrix{
    pub a:Vector,
    pub b:Vector,
    pub c:Vector
}

impl Matrix{

    pub fn new(a:Vector,b:Vector,c:Vector) -> Matrix{
        return Matrix{a,b,c};
    }
    /** Returns the identity matrix */
    pub fn identity() -> Matrix{
        return Matrix{
            a:Vector::unit(Axis::X),
            b:Vector::unit(Axis::Y),
            c:Vector::unit(Axis::Z)
        }
    }
    /** Returns Matrix of all zeros */
    pub fn zeros() -> Matrix{
        return Matrix{
            a:Vector::null(),
            b:Vector::null(),
            c:Vector::null()
        }
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::new(
            Vector::new(self.a.x,self.b.x,self.c.x),
            Vector::new(self.a.y,self.b.y,self.c.y),
            Vector::new(self.a.z,self.b.z,self.c.z)
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.b.cross(&self.c)
    }

}

/** Matrix-vector multiplication */
impl ops::Mul<Vector> for Matrix {
    type Output = Vector;
    fn mul(self, _rhs:Vector) -> Vector {
        return Vector{x:self.a*_rhs,y:self.b*_rhs,z:self.c*_rhs};
    }
}

/** Matrix-matrix multiplication */
impl ops::Mul<Matrix> for Matrix {
    type Output = Matrix;
    fn mul(self, _rhs:Matrix) -> Matrix {
        let t = _rhs.transpose();
        return Matrix{
            a:Vector::new(self.a*t.a,self.a*t.b,self.a*t.c),
            b:Vector::new(self.b*t.a,self.b*t.b,self.b*t.c),
            c:Vector::new(self.c*t.a,self.c*t.b,self.c*t.c),
        };
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{},{}", self.x,self.y,self.z)
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("z", &self.z)
            .finish()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\n{}\n{}\n{}", self.a,self.b,self.c)
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("c", &self.c)
            .finish()
    }
}

impl AbsDiffEq for Vector {
    type Epsilon = f64;
    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.x.abs_diff_eq(&other.x,epsilon) &&
        self.y.abs_diff_eq(&other.y,epsilon) &&
        self.z.abs_diff_eq(&other.z,epsilon)
    }
}

impl RelativeEq for Vector {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }
    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.x.relative_eq(&other.x,epsilon,max_relative) &&
        self.y.relative_eq(&other.y,epsilon,max_relative) &&
        self.z.relative_eq(&other.z,epsilon,max_relative)
    }
}

impl AbsDiffEq for Matrix {
    type Epsilon = f64;
    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.a.abs_diff_eq(&other.a,epsilon) &&
        self.b.abs_diff_eq(&other.b,epsilon) &&
        self.c.abs_diff_eq(&other.c,epsilon)
    }
}
