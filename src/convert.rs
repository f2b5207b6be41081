/*!
Pure conversion from raw argument strings to typed values.

Conversions compose sequentially with [`Convert::then`], and a type's
canonical conversion is chosen at compile time through [`FromArg`] rather
than a runtime type lookup. Failures carry a human-readable reason and are
folded into the single parse-error kind by whichever binding triggered the
read; callers never distinguish a conversion failure from a validation
failure.
*/

use core::fmt::{self, Display};
use core::marker::PhantomData;
use core::str::FromStr;

/// A human-readable reason why a value was rejected, produced by converters
/// and checkers alike.
#[derive(Debug, Clone)]
pub struct Invalid {
    reason: String,
}

impl Invalid {
    pub fn new(reason: impl Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// A pure conversion step from one value to another.
pub trait Convert {
    type Input;
    type Output;

    fn convert(&self, input: Self::Input) -> Result<Self::Output, Invalid>;

    /// Feed this conversion's output through `next`.
    fn then<C>(self, next: C) -> Then<Self, C>
    where
        Self: Sized,
        C: Convert<Input = Self::Output>,
    {
        Then { first: self, second: next }
    }
}

/// Sequential composition of two conversions. Built with [`Convert::then`].
#[derive(Debug, Clone, Copy)]
pub struct Then<A, B> {
    first: A,
    second: B,
}

impl<A, B> Convert for Then<A, B>
where
    A: Convert,
    B: Convert<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn convert(&self, input: Self::Input) -> Result<Self::Output, Invalid> {
        self.second.convert(self.first.convert(input)?)
    }
}

/// Adapter turning a plain function into a [`Convert`].
pub struct FnConvert<F, I, O> {
    func: F,
    marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> Convert for FnConvert<F, I, O>
where
    F: Fn(I) -> Result<O, Invalid>,
{
    type Input = I;
    type Output = O;

    fn convert(&self, input: I) -> Result<O, Invalid> {
        (self.func)(input)
    }
}

pub fn convert_with<F, I, O>(func: F) -> FnConvert<F, I, O>
where
    F: Fn(I) -> Result<O, Invalid>,
{
    FnConvert {
        func,
        marker: PhantomData,
    }
}

/// The conversion pipeline entry point a binding stores: raw argument string
/// in, bound type out.
pub type BoxConvert<T> = Box<dyn Convert<Input = String, Output = T>>;

/// Types with a canonical conversion from a raw argument string.
///
/// This is the compile-time "default converter for `T`" lookup: declaring an
/// option or parameter of type `T` picks `T::from_arg` unless a custom
/// converter is supplied.
pub trait FromArg: Sized {
    fn from_arg(raw: &str) -> Result<Self, Invalid>;
}

/// Marker for types whose [`FromStr`] implementation is their canonical
/// argument conversion.
pub trait ParsedArg: FromStr {}

impl<T> FromArg for T
where
    T: ParsedArg,
    T::Err: Display,
{
    #[inline]
    fn from_arg(raw: &str) -> Result<Self, Invalid> {
        raw.parse().map_err(Invalid::new)
    }
}

macro_rules! parsed_arg {
    ($($type:ident $($(::$path:ident)*,)?)*) => {
        $(
            impl ParsedArg for $type $($(:: $path)*)? {}
        )*
    };
}

parsed_arg! {
    bool char
    u8 u16 u32 u64 u128 usize
    i8 i16 i32 i64 i128 isize
    f32 f64

    std::string::String,
    std::path::PathBuf,

    core::net::Ipv4Addr,
    core::net::Ipv6Addr,
    core::net::IpAddr,
    core::net::SocketAddrV4,
    core::net::SocketAddrV6,
    core::net::SocketAddr,
}

/// The default conversion for a binding of type `T`: apply
/// [`FromArg::from_arg`] to the raw string.
pub struct Standard<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Standard<T> {
    pub fn new() -> Self {
        Self { marker: PhantomData }
    }
}

impl<T> Default for Standard<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromArg> Convert for Standard<T> {
    type Input = String;
    type Output = T;

    #[inline]
    fn convert(&self, input: String) -> Result<T, Invalid> {
        T::from_arg(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::{Convert, FromArg, Invalid, Standard, convert_with};

    #[test]
    fn standard_conversion_parses_via_from_str() {
        let converter = Standard::<i64>::new();
        assert_eq!(converter.convert("-17".to_owned()).unwrap(), -17);

        let error = converter.convert("seventeen".to_owned()).unwrap_err();
        assert!(error.to_string().contains("invalid digit"));
    }

    #[test]
    fn from_arg_default_lookup_is_per_type() {
        assert_eq!(u16::from_arg("80").unwrap(), 80);
        assert!(bool::from_arg("yes").is_err());
        assert_eq!(String::from_arg("as-is").unwrap(), "as-is");
    }

    #[test]
    fn then_runs_stages_in_sequence() {
        let parsed = Standard::<u32>::new().then(convert_with(|n: u32| match n {
            0 => Err(Invalid::new("zero is reserved")),
            n => Ok(n * 2),
        }));

        assert_eq!(parsed.convert("21".to_owned()).unwrap(), 42);
        assert_eq!(
            parsed.convert("0".to_owned()).unwrap_err().to_string(),
            "zero is reserved"
        );
    }
}
