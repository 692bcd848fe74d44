/// Implements the standard arithmetic traits for a single-field tuple struct wrapping an integer.
///
/// `op!(binary T, Add, add)` implements `Add for T`, `op!(inplace T, SubAssign, sub_assign)`
/// implements the in-place variant, and `op!(unary T, Neg, neg)` the unary one.
#[macro_export]
macro_rules! op {
    (binary $for_struct:ty, $impl_trait:ident, $func:ident) => {
        impl std::ops::$impl_trait for $for_struct {
            type Output = Self;

            fn $func(self, rhs: Self) -> Self::Output {
                Self(self.0.$func(rhs.0))
            }
        }
    };
    (inplace $for_struct:ty, $impl_trait:ident, $func:ident) => {
        impl std::ops::$impl_trait for $for_struct {
            fn $func(&mut self, rhs: Self) {
                self.0.$func(rhs.0)
            }
        }
    };
    (unary $for_struct:ty, $impl_trait:ident, $func:ident) => {
        impl std::ops::$impl_trait for $for_struct {
            type Output = Self;

            fn $func(self) -> Self::Output {
                Self(self.0.$func())
            }
        }
    };
}
