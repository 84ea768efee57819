/* build.rs for driver starcos */

fn main() {
    /* conditional compilation settings */
    println!("cargo:rustc-cfg=log"); // enables driver log output (tracing target "starcos", level DEBUG). Otherwise the driver will be almost quiet
    { // remove the leading // if You want that feature compiled in
//        println!("cargo:rustc-cfg=reselect_current_df"); // FullPath select of the already selected DF re-issues SELECT FILE (Starcos resets the DF's status on each select) instead of answering from the cache
        // alternatively, without editing this file: RUSTFLAGS="--cfg reselect_current_df" cargo test
    }
}
