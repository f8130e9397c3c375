use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

pub trait Executable {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError>;
}
