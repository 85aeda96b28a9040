mod timeline;

pub use timeline::{
    LoopConfig, MAX_SPOTS, SECONDS_PER_DAY, SlotContent, Spot, TimelineSlot, assign_content,
    build_loop, build_timeline, loops_between,
};
