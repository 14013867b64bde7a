//! System-wide constants: platform identifiers, well-known images,
//! resource names, and the environment variables injected into steps.

/// Version tag written into every compiled execution spec.
pub const SPEC_VERSION: u32 = 1;

/// Platform identifier for Windows hosts.
pub const PLATFORM_WINDOWS_AMD64: &str = "windows/amd64";
/// Platform identifier for 32-bit ARM Linux hosts.
pub const PLATFORM_LINUX_ARM: &str = "linux/arm";
/// Platform identifier for 64-bit ARM Linux hosts.
pub const PLATFORM_LINUX_ARM64: &str = "linux/arm64";

/// Name of the network and volume created for every pipeline.
pub const DEFAULT_RESOURCE_NAME: &str = "default";
/// Network driver used on Linux hosts.
pub const NETWORK_DRIVER_BRIDGE: &str = "bridge";
/// Network driver used on Windows hosts.
pub const NETWORK_DRIVER_NAT: &str = "nat";
/// Volume driver used for the default workspace volume.
pub const VOLUME_DRIVER_LOCAL: &str = "local";

/// Clone image used when no platform-specific variant applies.
pub const CLONE_IMAGE: &str = "tugboat/git";
/// Clone image for 32-bit ARM Linux.
pub const CLONE_IMAGE_LINUX_ARM: &str = "tugboat/git:linux-arm";
/// Clone image for 64-bit ARM Linux.
pub const CLONE_IMAGE_LINUX_ARM64: &str = "tugboat/git:linux-arm64";
/// Clone image for Windows.
pub const CLONE_IMAGE_WINDOWS: &str = "tugboat/git:windows-1803";
/// Logical name of the synthesized clone step.
pub const CLONE_STEP_NAME: &str = "clone";

/// Default workspace base directory mounted into every step.
pub const DEFAULT_WORKSPACE_BASE: &str = "/workspace";
/// Images promoted to privileged execution unless configured otherwise.
pub const DEFAULT_PRIVILEGED_IMAGES: &[&str] = &["plugins/docker"];

/// Prefix of environment variables derived from plugin parameters.
pub const PLUGIN_ENV_PREFIX: &str = "PLUGIN_";

/// Environment variable holding the logical step name.
pub const ENV_STEP: &str = "CI_STEP";
/// Environment variable listing injected secret names.
pub const ENV_SECRETS: &str = "CI_SECRETS";
/// Environment variable holding the full workspace path.
pub const ENV_WORKSPACE: &str = "CI_WORKSPACE";
/// Environment variable holding the workspace base path.
pub const ENV_WORKSPACE_BASE: &str = "CI_WORKSPACE_BASE";
/// Environment variable carrying the encoded Windows build script.
pub const ENV_SCRIPT: &str = "CI_SCRIPT";
/// Environment variable holding the netrc machine.
pub const ENV_NETRC_MACHINE: &str = "CI_NETRC_MACHINE";
/// Environment variable holding the netrc login.
pub const ENV_NETRC_USERNAME: &str = "CI_NETRC_USERNAME";
/// Environment variable holding the netrc password.
pub const ENV_NETRC_PASSWORD: &str = "CI_NETRC_PASSWORD";

/// Proxy variables captured from the compiling process.
pub const PROXY_VARIABLES: &[&str] = &["no_proxy", "http_proxy", "https_proxy"];

/// Path of the generated POSIX build script inside the container.
pub const SCRIPT_PATH: &str = "/bin/_tugboat";
/// Default POSIX shell used to run the build script.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Docker Hub hostname.
pub const DEFAULT_REGISTRY: &str = "docker.io";
/// Legacy Docker Hub hostname, normalized to [`DEFAULT_REGISTRY`].
pub const LEGACY_DEFAULT_REGISTRY: &str = "index.docker.io";
/// Implicit repository namespace of official Docker Hub images.
pub const DEFAULT_REPO_PREFIX: &str = "library";
/// Tag applied to image references without one.
pub const DEFAULT_TAG: &str = "latest";

/// Application name used in CLI output.
pub const APP_NAME: &str = "tugboat";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tug";
