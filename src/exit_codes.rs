/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const OPERATIONAL_FAILURE: i32 = 1;
}
