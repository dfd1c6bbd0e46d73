//! Snapshot tests for rendered guesttrace records

use guesttrace_record::{
    AccessRecord, AccessType, CallRecord, CallState, EnableRecord, FcallRecord, FixedText,
    LabelRecord, LabelType, LockRecord, Payload, Record, RecordError, SchedRecord, SegmentRecord,
    TaskEvent, TaskRecord,
};

fn render(payload: Payload, core_id: u16, access_count: u64) -> Result<String, RecordError> {
    let record: Record = payload.encode(core_id, access_count).decode()?;
    Ok(record.to_string())
}

#[test]
fn test_fcall_start_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Fcall(FcallRecord {
        tid: 1,
        pc: 0x1000,
        tag: 0x1,
        depth: 0,
        state: CallState::Start,
    });
    insta::assert_snapshot!("fcall_start", render(payload, 0, 0)?);
    Ok(())
}

#[test]
fn test_fcall_resume_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Fcall(FcallRecord {
        tid: 42,
        pc: 0xffff_ffff_8100_2000,
        tag: 0x3000_0000_0000_0010,
        depth: 2,
        state: CallState::Resume,
    });
    insta::assert_snapshot!("fcall_resume", render(payload, 3, 128)?);
    Ok(())
}

#[test]
fn test_label_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Label(LabelRecord {
        host_addr: 0,
        label_type: LabelType::Heap,
        text: FixedText::new("kmalloc-64"),
        guest_addr: 0xffff_8800_0001_0000,
        bytes: 64,
        pc: 0xffff_ffff_8110_0000,
    });
    insta::assert_snapshot!("label_heap", render(payload, 1, 7)?);
    Ok(())
}

#[test]
fn test_access_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Access(AccessRecord {
        access_type: AccessType::Store,
        pc: 0x4000,
        host_addr: 0,
        guest_addr: 0x8000,
    });
    insta::assert_snapshot!("access_store", render(payload, 0, 9)?);
    Ok(())
}

#[test]
fn test_enable_snapshots() -> Result<(), RecordError> {
    let all = Payload::Enable(EnableRecord::AccessAllCores {
        enabled: true,
        scope: FixedText::new("fork-bench"),
    });
    insta::assert_snapshot!("enable_access_all", render(all, 0, 1)?);

    let call = Payload::Enable(EnableRecord::CallCore {
        enabled: false,
        core: 2,
    });
    insta::assert_snapshot!("enable_call_core", render(call, 2, 4)?);
    Ok(())
}

#[test]
fn test_segment_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Segment(SegmentRecord {
        base: 0x1_0000,
        end: 0x2_0000,
        object_type: LabelType::PerCore,
    });
    insta::assert_snapshot!("segment_percore", render(payload, 1, 0)?);
    Ok(())
}

#[test]
fn test_call_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Call(CallRecord {
        target_pc: 0x5000,
        return_pc: 0x5104,
        ret: -1,
    });
    insta::assert_snapshot!("call_direct", render(payload, 0, 2)?);
    Ok(())
}

#[test]
fn test_lock_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Lock(LockRecord {
        pc: 0x6000,
        lock: 0xffff_8800_0000_0040,
        name: FixedText::new("&mm->mmap_sem"),
        release: false,
        read: true,
    });
    insta::assert_snapshot!("lock_acquire_read", render(payload, 0, 3)?);
    Ok(())
}

#[test]
fn test_task_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Task(TaskRecord {
        tid: 100,
        tgid: 100,
        event: TaskEvent::Init,
        description: FixedText::new("/bin/sh -c make"),
    });
    insta::assert_snapshot!("task_init", render(payload, 0, 0)?);
    Ok(())
}

#[test]
fn test_sched_snapshot() -> Result<(), RecordError> {
    let payload = Payload::Sched(SchedRecord { tid: 7 });
    insta::assert_snapshot!("sched", render(payload, 1, 11)?);
    Ok(())
}
