//! Helper macro for generating domain port error enums.

/// Generate a thiserror enum with snake_case convenience constructors.
///
/// Every variant uses named fields; constructor parameters accept
/// `impl Into<FieldType>` so call sites can pass string slices for `String`
/// fields without ceremony.
macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant {
                    $(
                        #[doc = concat!("The `", stringify!($field), "` value for this error.")]
                        $field : $ty
                    ),*
                },
            )*
        }

        ::paste::paste! {
            impl $name {
                $(
                    #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                        Self::$variant { $($field: $field.into()),* }
                    }
                )*
            }
        }
    };
}

pub(crate) use define_port_error;
