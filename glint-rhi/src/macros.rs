#[macro_export]
macro_rules! vk_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $ident:ident: $vk_type:ty {
            $(
                $(#[$field_meta:meta])*
                $variant_ident:ident = $vk_ident:ident
            ),*
            $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $vis enum $ident {
            $(
                $(#[$field_meta])*
                $variant_ident,
            )*
        }

        impl std::fmt::Display for $ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(
                        <Self>::$variant_ident => stringify!($variant_ident),
                    )*
                })
            }
        }

        impl $ident {
            pub const fn from_vk(value: $vk_type) -> Option<Self> {
                match value {
                    $(
                        <$vk_type>::$vk_ident => Some(<Self>::$variant_ident),
                    )*
                    _ => None,
                }
            }

            pub const fn to_vk(self) -> $vk_type {
                match self {
                    $(
                        <Self>::$variant_ident => <$vk_type>::$vk_ident,
                    )*
                }
            }
        }
    }
}
