// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the agent workspace.
//!
//! - [`simple_display!`] — map enum variants to their wire literals
//!   (state types, image pull policies)
//! - [`builder!`] — test builders for server-side records
//!   (`FlowRunBuilder` and friends in `test_support`)
//! - [`setters!`] — chainable setters on config structs
//!   (`AgentConfig`, the infrastructure variants)

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore
/// fields. Used for enums whose `Display` must equal their serialized wire
/// form, e.g. `StateType::Pending` printing as `PENDING` in log fields.
///
/// ```ignore
/// crate::simple_display! {
///     StateType {
///         Scheduled => "SCHEDULED",
///         Pending => "PENDING",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $text:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $text, )+
                })
            }
        }
    };
}

/// Generate a test builder (struct + `Default` + setters + `build()`).
///
/// All generated items are gated behind `#[cfg(any(test, feature = "test-support"))]`,
/// so builders exist for this crate's tests and for dependents that opt into
/// the `test-support` feature, and never in production builds.
///
/// Field groups:
/// - `into { field: Type = default }` — setter takes `impl Into<Type>`
/// - `set { field: Type = default }` — setter takes `Type` directly
/// - `option { field: Type = default }` — builder field is `Option<Type>`,
///   setter wraps in `Some(v.into())`
/// - `computed { field: Type = expr }` — no builder field or setter;
///   the expression runs at `build()` time (fresh ids, timestamps)
///
/// ```ignore
/// crate::builder! {
///     pub struct FlowRunBuilder => FlowRun {
///         into { name: String = "test-run" }
///         option { deployment_id: DeploymentId = None }
///         computed { id: FlowRunId = FlowRunId::new() }
///     }
/// }
///
/// let run = FlowRun::builder().name("nightly-etl").build();
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $record:ident {
            $(into {
                $( $ifield:ident : $ity:ty = $idefault:expr ),* $(,)?
            })?
            $(set {
                $( $sfield:ident : $sty:ty = $sdefault:expr ),* $(,)?
            })?
            $(option {
                $( $ofield:ident : $oty:ty = $odefault:expr ),* $(,)?
            })?
            $(computed {
                $( $cfield:ident : $cty:ty = $cexpr:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $ifield: $ity, )*)?
            $($( $sfield: $sty, )*)?
            $($( $ofield: Option<$oty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $($( $ifield: $idefault.into(), )*)?
                    $($( $sfield: $sdefault, )*)?
                    $($( $ofield: $odefault, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $ifield(mut self, v: impl Into<$ity>) -> Self {
                    self.$ifield = v.into();
                    self
                }
            )*)?

            $($(
                pub fn $sfield(mut self, v: $sty) -> Self {
                    self.$sfield = v;
                    self
                }
            )*)?

            $($(
                pub fn $ofield(mut self, v: impl Into<$oty>) -> Self {
                    self.$ofield = Some(v.into());
                    self
                }
            )*)?

            pub fn build(self) -> $record {
                $record {
                    $($( $ifield: self.$ifield, )*)?
                    $($( $sfield: self.$sfield, )*)?
                    $($( $ofield: self.$ofield, )*)?
                    $($( $cfield: $cexpr, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $record {
            /// Create a builder with test defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}

/// Generate chainable setter methods inside an existing `impl` block.
///
/// Field groups work like [`builder!`] but without defaults; the struct's
/// own constructor supplies those. This is what backs the configuration
/// surfaces, e.g. `AgentConfig::new(queues).prefetch(window)` or
/// `KubernetesJob::default().namespace("flows").image("prefect:2")`.
///
/// ```ignore
/// impl AgentConfig {
///     prefect_core::setters! {
///         option {
///             prefetch: Duration,
///             default_infrastructure: Infrastructure,
///         }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into {
            $( $ifield:ident : $ity:ty ),* $(,)?
        })?
        $(set {
            $( $sfield:ident : $sty:ty ),* $(,)?
        })?
        $(option {
            $( $ofield:ident : $oty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $ifield(mut self, v: impl Into<$ity>) -> Self {
                self.$ifield = v.into();
                self
            }
        )*)?

        $($(
            pub fn $sfield(mut self, v: $sty) -> Self {
                self.$sfield = v;
                self
            }
        )*)?

        $($(
            pub fn $ofield(mut self, v: impl Into<$oty>) -> Self {
                self.$ofield = Some(v.into());
                self
            }
        )*)?
    };
}
