use crate::model;

pub type ProgressFn<'a> = dyn FnMut(u64) + 'a;
pub type CancelFn<'a> = dyn Fn() -> bool + 'a;
pub type ChunkFn<'a> = dyn FnMut(u64) -> Result<(), model::BrowseError> + 'a;

pub fn transfer_callback<'a, P, C>(
    mut progress: Option<&'a mut P>,
    cancel: Option<&'a C>,
) -> Option<impl FnMut(u64) -> Result<(), model::BrowseError> + 'a>
where
    P: FnMut(u64) + ?Sized,
    C: Fn() -> bool + ?Sized,
{
    if progress.is_none() && cancel.is_none() {
        return None;
    }

    let mut transferred: u64 = 0;
    Some(move |chunk: u64| {
        if cancel.is_some_and(|is_cancelled| is_cancelled()) {
            return Err(model::BrowseError::Cancelled);
        }

        transferred += chunk;
        if let Some(report) = progress.as_mut() {
            report(transferred);
        }

        if cancel.is_some_and(|is_cancelled| is_cancelled()) {
            return Err(model::BrowseError::Cancelled);
        }

        Ok(())
    })
}
