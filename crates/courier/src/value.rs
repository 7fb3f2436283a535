//! Transportable payload values carried by requests and acks.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One argument or response value.
///
/// Messages never leave the process, so values are plain Rust data; the
/// closed set keeps dispatchers matchable. Anything else travels as
/// [`Value::Opaque`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
	#[default]
	Nil,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	Bytes(Vec<u8>),
	List(Vec<Value>),
	Opaque(Opaque),
}

impl Value {
	pub fn is_nil(&self) -> bool {
		matches!(self, Self::Nil)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Bytes(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Self::List(v) => Some(v),
			_ => None,
		}
	}

	/// Downcasts an opaque payload.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Self::Opaque(v) => v.downcast_ref(),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => f.write_str("nil"),
			Self::Bool(v) => write!(f, "{v}"),
			Self::Int(v) => write!(f, "{v}"),
			Self::Float(v) => write!(f, "{v}"),
			Self::Str(v) => f.write_str(v),
			Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
			Self::List(items) => {
				f.write_str("[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(" ")?;
					}
					write!(f, "{item}")?;
				}
				f.write_str("]")
			}
			Self::Opaque(_) => f.write_str("<opaque>"),
		}
	}
}

/// Shared payload that is not one of the built-in value kinds.
///
/// Equality is identity: two opaque values are equal when they share the
/// same allocation.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Arc::new(value))
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl fmt::Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Opaque(..)")
	}
}

impl PartialEq for Opaque {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl From<()> for Value {
	fn from(_: ()) -> Self {
		Self::Nil
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

macro_rules! int_into_value {
	($($ty:ty),*) => {
		$(impl From<$ty> for Value {
			fn from(v: $ty) -> Self {
				Self::Int(i64::from(v))
			}
		})*
	};
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
	fn from(v: f32) -> Self {
		Self::Float(f64::from(v))
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Self::Str(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Self::Str(v)
	}
}

impl From<&String> for Value {
	fn from(v: &String) -> Self {
		Self::Str(v.clone())
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		Self::Bytes(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Self::List(v)
	}
}

impl From<Opaque> for Value {
	fn from(v: Opaque) -> Self {
		Self::Opaque(v)
	}
}

impl<T> From<Option<T>> for Value
where
	T: Into<Value>,
{
	fn from(v: Option<T>) -> Self {
		v.map_or(Self::Nil, Into::into)
	}
}

/// Builds a `Vec<Value>` from expressions convertible into [`Value`].
///
/// ```
/// let args = courier::args!["key", 42, true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
	() => {
		::std::vec::Vec::<$crate::Value>::new()
	};
	($($value:expr),+ $(,)?) => {
		::std::vec![$($crate::Value::from($value)),+]
	};
}

/// Response payload of a call: an ordered sequence of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack(Vec<Value>);

impl Ack {
	/// An ack carrying no values.
	pub fn empty() -> Self {
		Self::default()
	}

	/// An ack carrying exactly one value.
	pub fn one(value: impl Into<Value>) -> Self {
		Self(vec![value.into()])
	}

	pub fn get(&self, index: usize) -> Option<&Value> {
		self.0.get(index)
	}

	pub fn values(&self) -> &[Value] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_values(self) -> Vec<Value> {
		self.0
	}
}

impl From<Vec<Value>> for Ack {
	fn from(values: Vec<Value>) -> Self {
		Self(values)
	}
}

impl fmt::Display for Ack {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", Value::List(self.0.clone()))
	}
}

/// How the sender of a [`Request`] expects it to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
	/// Fire-and-forget; the returned ack is discarded.
	Send,
	/// The returned ack is delivered to the caller's session callback.
	Call,
}

/// Inbound message as seen by a dispatcher: method tag plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
	kind: RequestKind,
	tag: String,
	args: Vec<Value>,
}

impl Request {
	pub(crate) fn new(kind: RequestKind, tag: impl Into<String>, args: Vec<Value>) -> Self {
		Self { kind, tag: tag.into(), args }
	}

	pub fn kind(&self) -> RequestKind {
		self.kind
	}

	/// Returns `true` when the sender waits for the returned ack.
	pub fn expects_reply(&self) -> bool {
		self.kind == RequestKind::Call
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	pub fn args(&self) -> &[Value] {
		&self.args
	}

	/// Returns argument `index`, or [`Value::Nil`] when absent.
	pub fn arg(&self, index: usize) -> &Value {
		static NIL: Value = Value::Nil;
		self.args.get(index).unwrap_or(&NIL)
	}

	pub fn into_args(self) -> Vec<Value> {
		self.args
	}
}

impl fmt::Display for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}(", self.tag)?;
		for (i, arg) in self.args.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{arg}")?;
		}
		f.write_str(")")
	}
}
