#[derive(Clone, Debug)]
pub(crate) struct Config {
    /// Operation names the `stat_*` helpers act on
    pub(crate) stat_ops: Vec<String>,

    /// Operation name `zeno_read` halves requests for
    pub(crate) read_op: String,

    /// Whether `build` populates a new table with the `std::fs` backend
    pub(crate) std_fs: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            stat_ops: vec!["stat".into(), "lstat".into(), "fstat".into()],
            read_op: "read".into(),
            std_fs: true,
        }
    }
}
