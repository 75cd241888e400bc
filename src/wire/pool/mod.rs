//! エンコード時に使用する作業用バッファのプール。
//!
//! バッファの貸し出し (`checkout`) と返却 (`give_back`) はそれぞれ独立した操作で、複数のスレッドから同時に呼び
//! 出すことができます。貸し出されたバッファは返却されるまで借り手が排他的に所有し、プールが使用中のバッファを
//! 参照することはありません。
use std::sync::{Mutex, MutexGuard};


/// 共有プールが保持するバッファの最大数。
pub const DEFAULT_MAX_BUFFERS: usize = 32;

/// 共有プールへ返却できるバッファの最大容量。これより大きなバッファは返却時に破棄されます。
pub const DEFAULT_MAX_CAPACITY: usize = 64 * 1024;

static SHARED: BufferPool = BufferPool::new(DEFAULT_MAX_BUFFERS, DEFAULT_MAX_CAPACITY);

/// プロセス全体で共有されるバッファプールを参照します。
pub fn shared() -> &'static BufferPool {
  &SHARED
}

pub struct BufferPool {
  buffers: Mutex<Vec<Vec<u8>>>,
  max_buffers: usize,
  max_capacity: usize,
}

impl BufferPool {
  /// 最大 `max_buffers` 個、それぞれ容量 `max_capacity` バイトまでのバッファを保持するプールを構築します。
  pub const fn new(max_buffers: usize, max_capacity: usize) -> BufferPool {
    BufferPool { buffers: Mutex::new(Vec::new()), max_buffers, max_capacity }
  }

  /// 空のバッファを貸し出します。プールが空の場合は新しいバッファを割り当てます。
  pub fn checkout(&self) -> Vec<u8> {
    self.lock().pop().unwrap_or_default()
  }

  /// 貸し出されたバッファを返却します。バッファの内容は消去されます。
  pub fn give_back(&self, mut buffer: Vec<u8>) {
    if buffer.capacity() == 0 {
      return;
    }
    if buffer.capacity() > self.max_capacity {
      log::trace!("discarding oversized buffer: {} bytes, max={}", buffer.capacity(), self.max_capacity);
      return;
    }
    buffer.clear();
    let mut buffers = self.lock();
    if buffers.len() < self.max_buffers {
      buffers.push(buffer);
    } else {
      log::trace!("buffer pool is full: {}", self.max_buffers);
    }
  }

  /// 現在プールに保持されているバッファの数。
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
    // 保持しているのは空のバッファだけなので、ポイズニングされていても内容は整合している
    self.buffers.lock().unwrap_or_else(|e| e.into_inner())
  }
}
