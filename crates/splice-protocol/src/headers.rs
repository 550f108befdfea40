// File: src/headers.rs
// Purpose: Canonical header names for the hybrid protocol

/// Marker header. Present on every hybrid request; the server echoes it on
/// every hybrid response. A response without it is treated as non-hybrid.
pub const MARKER: &str = "x-splice";

/// Asset version known to the client, sent on every hybrid request.
pub const VERSION: &str = "x-splice-version";

/// JSON-encoded array of dot-paths the client wants resolved (partial reload).
pub const ONLY: &str = "x-splice-only";

/// JSON-encoded array of dot-paths the client wants excluded (partial reload).
pub const EXCEPT: &str = "x-splice-except";

/// Name of the validation error bag the client is interested in.
pub const ERROR_BAG: &str = "x-splice-error-bag";

/// Response-only header: instructs the client to perform a full browser
/// navigation to the given URL, bypassing the hybrid protocol.
pub const EXTERNAL: &str = "x-splice-location";
