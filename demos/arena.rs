use std::{io::Read, ptr};

use rarena::Arena;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just read the trace output region by region.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  // Surface the arena's trace diagnostics (region creation/teardown):
  //   RUST_LOG=trace cargo run --example arena
  env_logger::init();

  // A private arena. The same walk-through works against Arena::global().
  // The annotation picks the default backing store; defaults on type
  // parameters do not drive inference on their own.
  let arena: Arena = Arena::new();

  unsafe {
    println!("PID = {}, regions = {}", std::process::id(), arena.region_count());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) First allocation. No region exists yet, so this creates one of at
    //    least DEFAULT_CAPACITY bytes and bumps it by 64.
    // --------------------------------------------------------------------
    let first = arena.allocate(64, ptr::null());
    println!("\n[1] Allocate 64 bytes");
    println!("[1] address = {:?}, regions = {}", first, arena.region_count());

    ptr::write_bytes(first, 0xAB, 64);
    println!("[1] Initialized the block with 0xAB");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Second allocation lands right behind the first: same region,
    //    contiguous addresses.
    // --------------------------------------------------------------------
    let second = arena.allocate(32, ptr::null());
    println!("\n[2] Allocate 32 bytes");
    println!("[2] address = {:?}", second);
    println!(
      "[2] second == first + 64? {}",
      if second as usize == first as usize + 64 {
        "Yes, carved from the same region"
      } else {
        "No, it landed somewhere else"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the second block and allocate again. The freed block was at
    //    the top of the region, so the bump boundary moved back and the
    //    new allocation reuses the same address (LIFO reuse).
    // --------------------------------------------------------------------
    arena.deallocate(second, 32);
    let third = arena.allocate(16, ptr::null());
    println!("\n[3] Free the 32-byte block, allocate 16 bytes");
    println!("[3] address = {:?}", third);
    println!(
      "[3] third == second? {}",
      if third == second {
        "Yes, top-of-region space was reclaimed"
      } else {
        "No, the tail was not recovered"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Grow the top allocation in place. No copy happens: the bump
    //    boundary simply moves further.
    // --------------------------------------------------------------------
    let grown = arena.reallocate(third, 16, 48, ptr::null());
    println!("\n[4] Reallocate the top block from 16 to 48 bytes");
    println!(
      "[4] grown == third? {} (in-place growth)",
      if grown == third { "Yes" } else { "No" }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Grow a buried allocation. `first` is not at the top anymore, so
    //    the arena allocates fresh storage, copies the old contents and
    //    frees the old block.
    // --------------------------------------------------------------------
    let moved = arena.reallocate(first, 64, 128, ptr::null());
    println!("\n[5] Reallocate the buried 64-byte block to 128 bytes");
    println!("[5] old = {:?}, new = {:?}", first, moved);
    println!(
      "[5] contents preserved? {}",
      if *moved == 0xAB && *moved.add(63) == 0xAB {
        "Yes, the first 64 bytes were copied"
      } else {
        "No"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Force a second region: fill most of the first one, then ask for
    //    a block that no longer fits before its end.
    // --------------------------------------------------------------------
    let filler = arena.allocate(3000, ptr::null());
    let spill = arena.allocate(2000, ptr::null());
    println!("\n[6] Allocate 3000 bytes, then 2000 bytes");
    println!(
      "[6] filler = {:?}, spill = {:?}, regions = {}",
      filler,
      spill,
      arena.region_count()
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) Hint-directed placement. First fit would put this small request
    //    back in the original region; the hint pulls it into the region
    //    holding `spill` instead, right behind it.
    // --------------------------------------------------------------------
    let near_spill = arena.allocate(100, spill);
    println!("\n[7] Allocate 100 bytes with hint = spill");
    println!("[7] address = {:?}", near_spill);
    println!(
      "[7] near_spill == spill + 2000? {}",
      if near_spill as usize == spill as usize + 2000 {
        "Yes, the hint kept it in the same region"
      } else {
        "No, first fit won"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 8) A zero-size request is never an error, it just yields null. Then
    //    end of demo: dropping the arena releases every region's backing
    //    memory in one sweep; nothing is freed before that.
    // --------------------------------------------------------------------
    let nothing = arena.allocate(0, ptr::null());
    println!("\n[8] allocate(0) = {:?} (zero-size requests yield null)", nothing);

    arena.deallocate(grown, 48);
    arena.deallocate(moved, 128);
    arena.deallocate(filler, 3000);
    arena.deallocate(spill, 2000);
    arena.deallocate(near_spill, 100);
    println!("[8] End of example. Dropping the arena releases all regions.");
  }
}
