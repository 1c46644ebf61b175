//! Backend paths, relative to the configured base URL.

/// `POST` `{email, password}` → `{accessToken}` or `{message}`.
pub const CREATE_TOKEN: &str = "Authentication/CreateTokenForUser";

/// `GET` → current user, including `roles`.
pub const MY_USER_DATA: &str = "GetMyUserData";

// Domain resources. Payloads pass through the gateway untouched.
pub const COMPANY: &str = "Company";
pub const JOB_POSTING: &str = "JobPosting";
pub const MY_JOB_POSTING: &str = "MyJobPosting";
pub const RESUME: &str = "Resume";
pub const USER: &str = "User";
