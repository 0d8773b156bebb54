use super::{Runtime, RuntimeInfo};
use crate::Result;
use url::Url;

/// One entry of [`RUNTIME_REGISTRY`], emitted by [`register_runtime!`](crate::register_runtime).
#[doc(hidden)]
pub struct RuntimeRegistration {
    pub info: RuntimeInfo,
    pub schemes: &'static [&'static str],
    pub build: fn(&Url) -> Result<Box<dyn Runtime>>,
}

impl RuntimeRegistration {
    /// True when this runtime is selected by URIs with `scheme`.
    pub fn handles(&self, scheme: &str) -> bool {
        self.schemes.contains(&scheme)
    }
}

/// Every runtime linked into the binary.
#[doc(hidden)]
#[linkme::distributed_slice]
pub static RUNTIME_REGISTRY: [RuntimeRegistration];

/// Adds a runtime to [`RUNTIME_REGISTRY`] and gives it a `RUNTIME_NAME` const.
///
/// `from_url` must be a `fn(&Url) -> Result<Self>`.
///
/// ```ignore
/// register_runtime! {
///     OciRuntime {
///         name: "oci",
///         description: "Docker or Podman containers",
///         schemes: ["docker", "podman"],
///         examples: ["docker://"],
///         from_url: OciRuntime::from_url,
///     }
/// }
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! register_runtime {
    (
        $runtime:ident {
            name: $name:literal,
            description: $description:literal,
            schemes: [$($scheme:literal),+ $(,)?],
            examples: [$($example:literal),* $(,)?],
            from_url: $from_url:path $(,)?
        }
    ) => {
        impl $runtime {
            pub const RUNTIME_NAME: &'static str = $name;
        }

        const _: () = {
            fn build(url: &::url::Url) -> $crate::Result<::std::boxed::Box<dyn $crate::runtime::Runtime>> {
                let runtime: $runtime = $from_url(url)?;
                Ok(::std::boxed::Box::new(runtime))
            }

            #[linkme::distributed_slice($crate::runtime::RUNTIME_REGISTRY)]
            static REGISTRATION: $crate::runtime::RuntimeRegistration =
                $crate::runtime::RuntimeRegistration {
                    info: $crate::runtime::RuntimeInfo {
                        name: $name,
                        description: $description,
                        examples: &[$($example),*],
                    },
                    schemes: &[$($scheme),+],
                    build,
                };
        };
    };
}
