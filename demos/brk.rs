use std::{io::Read, ptr};

use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break and where the allocator will carve next.
fn print_program_break(label: &str) {
  let stats = brkalloc::stats();
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}, cursor = {:#X}, blocks = {} ({} free)",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
    stats.cursor,
    stats.blocks,
    stats.free_blocks,
  );
}

fn main() {
  // Set DEBUG_MALLOC=1 to see one trace line per call below.
  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate space for a u32. The first call grows the break by a
    //    whole 64 KiB chunk.
    // --------------------------------------------------------------------
    let first_block = brkalloc::malloc(4);
    println!("\n[1] malloc(4) = {:?}", first_block);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());
    print_program_break("after first malloc");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes. Comes out of the same chunk, 16-aligned.
    // --------------------------------------------------------------------
    let second_block = brkalloc::malloc(12);
    println!("\n[2] malloc(12) = {:?}", second_block);
    ptr::write_bytes(second_block, 0xAB, 12);
    println!("[2] Address % 16 = {}", second_block as usize % 16);
    print_program_break("after second malloc");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the first block and ask for 2 bytes: first fit hands the
    //    freed block straight back.
    // --------------------------------------------------------------------
    brkalloc::free(first_block);
    let third_block = brkalloc::malloc(2);
    println!(
      "\n[3] malloc(2) = {:?}, reused first_block? {}",
      third_block,
      if third_block == first_block { "Yes" } else { "No" }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Grow the second block. It is the last block, so it stretches in
    //    place while the chunk has room.
    // --------------------------------------------------------------------
    let grown = brkalloc::realloc(second_block, 400);
    println!(
      "\n[4] realloc(second_block, 400) = {:?}, moved? {}",
      grown,
      grown != second_block
    );
    println!("[4] First byte still 0x{:X}", *grown);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Allocate a block bigger than a chunk: the break grows by exactly
    //    that block's size.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");
    let big_block = brkalloc::calloc(128, 1024);
    println!("\n[5] calloc(128, 1024) = {:?}", big_block);
    print_program_break("after large alloc");

    block_until_enter_pressed();

    println!("\n[6] End of example. Process will exit and the OS will reclaim all memory.");
  }
}
