//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper for `#[graphql(with = ..)]` attributes of string scalars backed by
/// a validated domain type `As`, like `SaleName` or `UserId`.
///
/// Input is validated by the [`FromStr`] impl of `As`, so a blank sale name
/// never reaches the service, while output is rendered with its
/// [`Display`] impl.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Renders the target type as a string scalar [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Parses the target type out of a string [`InputValue`].
    ///
    /// # Errors
    ///
    /// If the input is not a string, or `As` rejects it.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("scalar");
        let Some(s) = input.as_string_value() else {
            return Err(format!("`{name}` expects a string, found: {input}"));
        };
        let parsed = s
            .parse::<As>()
            .map_err(|e| format!("Invalid `{name}` \"{s}\": {e}"))?;
        T::try_from(parsed).map_err(|e| format!("Invalid `{name}`: {e}"))
    }

    /// Parses the provided [`ScalarToken`] as a [`String`].
    ///
    /// # Errors
    ///
    /// If the token is not a string literal.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue};

    use crate::api::sale;

    use super::Via;

    type SaleName = Via<service::domain::sale::Name>;

    #[test]
    fn parses_valid_sale_name() {
        let input = InputValue::<DefaultScalarValue>::scalar("Black Friday");
        let name: sale::Name = SaleName::from_input(&input).unwrap();

        assert_eq!(name.to_string(), "Black Friday");
    }

    #[test]
    fn rejects_non_string_input() {
        let input = InputValue::<DefaultScalarValue>::scalar(42);
        let err = SaleName::from_input::<sale::Name, _>(&input).unwrap_err();

        assert!(err.contains("SaleName"), "{err}");
    }
}
