//! WebAssembly proposal toggles.

macro_rules! define_features {
    ($( $variant:ident, $field:ident, $name:literal, $default:expr; )*) => {
        /// A single proposal that can be switched on or off.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $( $variant, )*
        }

        impl Feature {
            /// Command-line name of the feature (`simd`, `tail-call`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    $( Feature::$variant => $name, )*
                }
            }
        }

        /// The set of proposals a reader or validator accepts.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Features {
            $( pub $field: bool, )*
        }

        impl Default for Features {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl Features {
            /// Names accepted by [`Features::set`].
            pub const NAMES: &'static [&'static str] = &[$( $name, )*];

            /// Every proposal enabled.
            pub fn all() -> Self {
                Self {
                    $( $field: true, )*
                }
            }

            /// Only the MVP instruction set.
            pub fn mvp() -> Self {
                Self {
                    $( $field: false, )*
                }
            }

            pub fn is_enabled(&self, feature: Feature) -> bool {
                match feature {
                    $( Feature::$variant => self.$field, )*
                }
            }

            /// Toggles a feature by its command-line name. Returns `false` for
            /// an unknown name.
            pub fn set(&mut self, name: &str, enabled: bool) -> bool {
                match name {
                    $( $name => self.$field = enabled, )*
                    _ => return false,
                }
                self.normalize();
                true
            }
        }
    };
}

define_features! {
    Exceptions, exceptions, "exceptions", false;
    MutableGlobals, mutable_globals, "mutable-globals", true;
    SatFloatToInt, sat_float_to_int, "saturating-float-to-int", true;
    SignExtension, sign_extension, "sign-extension", true;
    Simd, simd, "simd", true;
    Threads, threads, "threads", false;
    FunctionReferences, function_references, "function-references", false;
    MultiValue, multi_value, "multi-value", true;
    TailCall, tail_call, "tail-call", false;
    BulkMemory, bulk_memory, "bulk-memory", true;
    ReferenceTypes, reference_types, "reference-types", true;
    CodeMetadata, code_metadata, "code-metadata", false;
    Gc, gc, "gc", false;
    Memory64, memory64, "memory64", false;
    MultiMemory, multi_memory, "multi-memory", false;
    ExtendedConst, extended_const, "extended-const", false;
    RelaxedSimd, relaxed_simd, "relaxed-simd", false;
    CustomPageSizes, custom_page_sizes, "custom-page-sizes", false;
}

impl Features {
    /// Applies the dependencies between proposals.
    pub fn normalize(&mut self) {
        if self.gc {
            self.function_references = true;
        }
        if self.function_references || self.exceptions {
            self.reference_types = true;
        }
        if self.reference_types {
            self.bulk_memory = true;
        }
        if self.relaxed_simd {
            self.simd = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_finished_proposals() {
        let features = Features::default();
        assert!(features.simd);
        assert!(features.reference_types);
        assert!(!features.gc);
        assert!(!features.threads);
    }

    #[test]
    fn set_by_name_and_normalize() {
        let mut features = Features::mvp();
        assert!(features.set("gc", true));
        assert!(features.function_references);
        assert!(features.reference_types);
        assert!(features.bulk_memory);
        assert!(!features.set("no-such-feature", true));
    }

    #[test]
    fn feature_names_round_trip() {
        for name in Features::NAMES {
            let mut features = Features::mvp();
            assert!(features.set(name, true), "{name}");
        }
        assert_eq!(Feature::TailCall.name(), "tail-call");
    }
}
