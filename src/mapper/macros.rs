/// Declare a struct that can be populated from query result records.
///
/// Generates the struct, a `Default` derive, and a
/// [`FromRecord`](crate::mapper::FromRecord) impl. Fields take optional
/// `#[field(serialize = "...", db = "...")]` annotations controlling which
/// column they read; see [`crate::mapper`] for the resolution order.
///
/// Every field type must implement [`FromValue`](crate::mapper::FromValue)
/// and `Default`.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[field($($attr:ident = $val:literal),* $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $( $fvis $field: $ty, )*
        }

        impl $crate::mapper::FromRecord for $name {
            const FIELDS: &'static [$crate::mapper::FieldSpec] = &[
                $(
                    $crate::mapper::FieldSpec::new(stringify!($field))
                        $($( .$attr($val) )*)?,
                )*
            ];

            fn set_field(
                &mut self,
                field: &str,
                value: &$crate::model::Value,
            ) -> $crate::mapper::MapResult<()> {
                $(
                    if field == stringify!($field) {
                        self.$field = <$ty as $crate::mapper::FromValue>::from_value(value)?;
                        return Ok(());
                    }
                )*
                let _ = (field, value);
                Ok(())
            }
        }
    };
}
