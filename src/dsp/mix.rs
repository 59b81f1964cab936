//! Sample-wise summing of worker PCM blocks.

/*
Summing Worker Output
=====================

Each synthesis worker renders only the chip channels it owns, so the final
signal is the plain sum of every worker's block:

    out[i] = w0[i] + w1[i] + ... + wN[i]

The blocks are interleaved stereo 16-bit PCM (L, R, L, R, ...). Because both
channels of every frame are summed independently, interleaving does not
matter here: sample i of one buffer always lines up with sample i of the
others.


Overflow: Wrapping, Not Clipping
--------------------------------

Two loud workers can exceed the i16 range:

    w0:   [ 30000,  -30000 ]
    w1:   [  5000,   -5000 ]
    sum:  [ -30536,  30536 ]   <- wrapped

We deliberately WRAP (two's complement) instead of saturating. That is what
the hardware mixer does, and it keeps the sum exact in the sense that
matters for testing: wrapping addition is commutative and associative, so
the result does not depend on the order acknowledgments arrive in.

Saturating addition is not associative:

    sat(sat(30000 + 5000) + -5000) = 27767
    sat(30000 + sat(5000 + -5000)) = 30000

so a saturating mixer would make the output depend on worker order.
*/

/// Copy `src` into `acc`, starting a new mix.
#[inline]
pub fn begin_mix(acc: &mut [i16], src: &[i16]) {
    debug_assert_eq!(acc.len(), src.len());
    acc.copy_from_slice(src);
}

/// Add `src` into `acc` in place with wrapping 16-bit arithmetic.
#[inline]
pub fn sum_in_place(acc: &mut [i16], src: &[i16]) {
    debug_assert_eq!(acc.len(), src.len());

    for (a, &s) in acc.iter_mut().zip(src.iter()) {
        *a = a.wrapping_add(s);
    }
}

/// Mix every block in `sources` into `out`.
///
/// The first source seeds the accumulator; an empty source list yields
/// silence.
pub fn mix_blocks<'a, I>(out: &mut [i16], sources: I)
where
    I: IntoIterator<Item = &'a [i16]>,
{
    let mut sources = sources.into_iter();
    match sources.next() {
        Some(first) => begin_mix(out, first),
        None => {
            out.fill(0);
            return;
        }
    }

    for src in sources {
        sum_in_place(out, src);
    }
}

/// Duplicate a mono sample into one interleaved stereo frame.
#[inline]
pub fn write_stereo_frame(frame: &mut [i16], sample: i16) {
    debug_assert_eq!(frame.len(), 2);
    frame[0] = sample;
    frame[1] = sample;
}
