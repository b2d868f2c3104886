//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    /// All section names, in a stable order.
    fn sections(&self) -> Vec<String>;

    /// All keys present in `section`, in a stable order; empty when absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
