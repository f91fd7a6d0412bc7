//! Broadcast assignment between string arrays

use super::array::{pack_strings, slot_to_logical};
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::tensor::{NDArray, ShapeDescriptor};

/// Assign `x` into every broadcast position of `z`
///
/// `z` keeps its shape, ordering and encoding; elements of `x` are
/// re-encoded as needed. A one-element `x` fills every slot, otherwise the
/// broadcast view of `x` is walked in lockstep with `z`. Fails with a
/// broadcast error before anything is converted when `x` does not broadcast
/// to `z`.
///
/// `z` is replaced by a freshly packed buffer, so other views of its
/// previous buffer keep their contents.
pub fn broadcast_string_assign(ctx: &CpuContext, x: &NDArray, z: &mut NDArray) -> Result<()> {
    let from = x.encoding()?;
    z.encoding()?;
    if !x.descriptor().is_broadcastable_to(z.shape()) {
        return Err(Error::broadcast(x.shape(), z.shape()));
    }

    tracing::debug!(
        x_shape = ?x.shape(),
        z_shape = ?z.shape(),
        from = %x.dtype(),
        to = %z.dtype(),
        "broadcast_string_assign"
    );

    let target = ShapeDescriptor::contiguous(z.shape(), z.order(), z.dtype());
    let packed = if x.length() == 1 {
        let value = x.string_bytes(0)?;
        pack_strings(Some(ctx), target, move |_| Ok((value, from)), Some(ctx.workspace()))?
    } else {
        let view = x.broadcast_to(z.shape())?;
        let logical = slot_to_logical(&target);
        let view = &view;
        pack_strings(
            Some(ctx),
            target,
            move |slot| Ok((view.string_bytes(logical[slot])?, from)),
            Some(ctx.workspace()),
        )?
    };

    *z = packed;
    Ok(())
}
