use super::{Interceptor, Restore};
use crate::{Error, Value};

/// Position of the requested length in `read(fd, buffer, offset, length,
/// position)`.
const LENGTH_ARG: usize = 3;

impl Interceptor {
    /// Make every read ask for half as many bytes as the caller requested.
    ///
    /// Requested lengths of 0 and 1 are left alone, so a read never
    /// degenerates into an empty one and callers looping on short reads
    /// still make progress.
    pub fn zeno_read(&self) -> Result<Restore, Error> {
        self.mutate_args(&self.config.read_op, halve_length)
    }
}

fn halve_length(mut args: Vec<Value>) -> Vec<Value> {
    if let Some(Value::Int(len)) = args.get_mut(LENGTH_ARG) {
        if *len > 1 {
            *len /= 2;
        }
    }
    args
}
