pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
    fn ok_debug_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    /// Like [`ok_log`], but for transient, expected conditions (a target that
    /// is currently unmounted, a pool whose statistics are momentarily
    /// absent) which must not show up above debug level.
    ///
    /// [`ok_log`]: ResultOkLogExt::ok_log
    fn ok_debug_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}
