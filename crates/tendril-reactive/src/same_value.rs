//! Strict identity comparison for cell writes
//!
//! A write only notifies observers when the new value is not the *same value*
//! as the old one. The rule mirrors the ECMAScript SameValue algorithm:
//!
//! - `NaN` is the same value as `NaN` (whatever its payload bits),
//! - `+0.0` and `-0.0` are different values,
//! - shared pointers (`Rc`, `Arc`) compare by identity, not by contents,
//! - everything else compares structurally.
//!
//! Implement [`SameValue`] for your own types with
//! [`impl_same_value_by_eq!`](crate::impl_same_value_by_eq) when `PartialEq`
//! already has the right meaning.

extern crate alloc;
use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Identity comparison used to decide whether a cell write is a change
pub trait SameValue {
	/// Returns `true` when `self` and `other` are indistinguishable for
	/// change-notification purposes.
	fn same_value(&self, other: &Self) -> bool;
}

/// Implements [`SameValue`] by delegating to `PartialEq`
///
/// Only use this for types without floating point fields, otherwise `NaN`
/// writes would notify forever and signed zeros would be conflated.
///
/// ```
/// use tendril_reactive::impl_same_value_by_eq;
///
/// #[derive(Clone, PartialEq)]
/// struct Theme {
///     name: String,
/// }
///
/// impl_same_value_by_eq!(Theme);
/// ```
#[macro_export]
macro_rules! impl_same_value_by_eq {
	($($ty:ty),+ $(,)?) => {
		$(
			impl $crate::SameValue for $ty {
				#[inline]
				fn same_value(&self, other: &Self) -> bool {
					self == other
				}
			}
		)+
	};
}

impl_same_value_by_eq!(
	(),
	bool,
	char,
	u8,
	u16,
	u32,
	u64,
	u128,
	usize,
	i8,
	i16,
	i32,
	i64,
	i128,
	isize,
	String,
	&'static str,
	serde_json::Value,
);

impl SameValue for f64 {
	fn same_value(&self, other: &Self) -> bool {
		if self.is_nan() && other.is_nan() {
			return true;
		}
		self.to_bits() == other.to_bits()
	}
}

impl SameValue for f32 {
	fn same_value(&self, other: &Self) -> bool {
		if self.is_nan() && other.is_nan() {
			return true;
		}
		self.to_bits() == other.to_bits()
	}
}

impl<T: SameValue> SameValue for Option<T> {
	fn same_value(&self, other: &Self) -> bool {
		match (self, other) {
			(Some(a), Some(b)) => a.same_value(b),
			(None, None) => true,
			_ => false,
		}
	}
}

impl<T: SameValue, E: SameValue> SameValue for Result<T, E> {
	fn same_value(&self, other: &Self) -> bool {
		match (self, other) {
			(Ok(a), Ok(b)) => a.same_value(b),
			(Err(a), Err(b)) => a.same_value(b),
			_ => false,
		}
	}
}

impl<T: SameValue> SameValue for Vec<T> {
	fn same_value(&self, other: &Self) -> bool {
		self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
	}
}

impl<T: SameValue> SameValue for Box<T> {
	fn same_value(&self, other: &Self) -> bool {
		(**self).same_value(other)
	}
}

impl<T: ?Sized> SameValue for Rc<T> {
	fn same_value(&self, other: &Self) -> bool {
		Rc::ptr_eq(self, other)
	}
}

impl<T: ?Sized> SameValue for Arc<T> {
	fn same_value(&self, other: &Self) -> bool {
		Arc::ptr_eq(self, other)
	}
}

impl<T: ToOwned + PartialEq + ?Sized> SameValue for Cow<'static, T> {
	fn same_value(&self, other: &Self) -> bool {
		self.as_ref() == other.as_ref()
	}
}

impl<K: Ord, V: SameValue> SameValue for BTreeMap<K, V> {
	fn same_value(&self, other: &Self) -> bool {
		self.len() == other.len()
			&& self
				.iter()
				.zip(other)
				.all(|((ka, va), (kb, vb))| ka == kb && va.same_value(vb))
	}
}

impl<T: Ord> SameValue for BTreeSet<T> {
	fn same_value(&self, other: &Self) -> bool {
		self == other
	}
}

macro_rules! impl_same_value_tuple {
	($($name:ident : $idx:tt),+) => {
		impl<$($name: SameValue),+> SameValue for ($($name,)+) {
			fn same_value(&self, other: &Self) -> bool {
				$(self.$idx.same_value(&other.$idx))&&+
			}
		}
	};
}

impl_same_value_tuple!(A: 0);
impl_same_value_tuple!(A: 0, B: 1);
impl_same_value_tuple!(A: 0, B: 1, C: 2);
impl_same_value_tuple!(A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;

	#[rstest]
	fn test_nan_is_same_as_nan() {
		assert!(f64::NAN.same_value(&f64::NAN));
		assert!(f32::NAN.same_value(&f32::NAN));
		assert!(f64::NAN.same_value(&-f64::NAN));
	}

	#[rstest]
	fn test_signed_zeros_differ() {
		assert!(!0.0_f64.same_value(&-0.0_f64));
		assert!(!(-0.0_f32).same_value(&0.0_f32));
		assert!(0.0_f64.same_value(&0.0_f64));
	}

	#[rstest]
	fn test_rc_compares_by_identity() {
		let a = Rc::new(String::from("shared"));
		let b = Rc::new(String::from("shared"));

		assert!(a.same_value(&a.clone()));
		assert!(!a.same_value(&b));
	}

	#[rstest]
	fn test_containers_compare_elementwise() {
		assert!(vec![1.0, f64::NAN].same_value(&vec![1.0, f64::NAN]));
		assert!(!vec![0.0].same_value(&vec![-0.0]));
		assert!(Some(f64::NAN).same_value(&Some(f64::NAN)));
		assert!(!Some(1).same_value(&None));
		assert!((1, "a").same_value(&(1, "a")));
		assert!(!(1, 0.0).same_value(&(1, -0.0)));
	}

	#[rstest]
	fn test_btree_map_compares_values_strictly() {
		let mut a = BTreeMap::new();
		a.insert("x", f64::NAN);
		let mut b = BTreeMap::new();
		b.insert("x", f64::NAN);
		assert!(a.same_value(&b));

		b.insert("y", 1.0);
		assert!(!a.same_value(&b));
	}

	proptest! {
		#[test]
		fn prop_same_value_is_reflexive(x in any::<f64>()) {
			prop_assert!(x.same_value(&x));
		}

		#[test]
		fn prop_same_value_matches_bits_for_non_nan(a in any::<f64>(), b in any::<f64>()) {
			prop_assume!(!a.is_nan() && !b.is_nan());
			prop_assert_eq!(a.same_value(&b), a.to_bits() == b.to_bits());
		}

		#[test]
		fn prop_integers_follow_eq(a in any::<i64>(), b in any::<i64>()) {
			prop_assert_eq!(a.same_value(&b), a == b);
		}
	}
}
