/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied
/// once per module rather than per handler.

/// Routes reachable without a session token: health, registration and login.
pub mod public;

/// Routes behind the `AuthUser` gate. Every catalog operation lives here.
pub mod authenticated;
