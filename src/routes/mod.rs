/// Router Module Index
///
/// Routes are split by the gate that protects them. Each module's handlers
/// take the matching viewer extractor, so a route cannot be mounted in the
/// wrong module without the compiler noticing the missing viewer.

/// Routes open to everyone.
pub mod public;

/// Routes for any known user (the LMS dashboard).
pub mod authenticated;

/// Routes restricted to `ADMIN` profiles.
pub mod admin;
