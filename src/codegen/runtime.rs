//! # Runtime Emission
//!
//! Fixed assembly blocks appended after the generated user code: the
//! tracked allocator and conservative mark-sweep collector, bounds-failure
//! exit, I/O and string helpers, filesystem and process helpers, POSIX
//! socket plumbing, TLS via OpenSSL, a minimal HTTP/1.0 client with
//! redirect following, and the runtime data section.
//!
//! All C library and OpenSSL symbols referenced here are undefined
//! externals resolved at link time.

/// Allocator, mark-sweep collector, and the bounds-failure exit.
///
/// Heap cells carry a (next, size, mark) header; the payload starts at +24.
/// The collector treats every word between the recorded stack base and the
/// current stack pointer as a candidate pointer.
pub fn memory() -> &'static str {
    r#"
.globl vyl_alloc
vyl_alloc:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
addq $24, %rdi
call malloc
cmpq $0, %rax
je .Lvyl_alloc_fail
movq vyl_head(%rip), %rcx
movq %rcx, (%rax)
movq %rbx, 8(%rax)
movq $0, 16(%rax)
movq %rax, vyl_head(%rip)
addq $24, %rax
jmp .Lvyl_alloc_done
.Lvyl_alloc_fail:
movq $0, %rax
.Lvyl_alloc_done:
popq %r12
popq %rbx
leave
ret

.globl vyl_free
vyl_free:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
cmpq $0, %rdi
je .Lvyl_free_done
leaq -24(%rdi), %r12
movq vyl_head(%rip), %rbx
cmpq %r12, %rbx
jne .Lvyl_free_scan
movq (%r12), %rax
movq %rax, vyl_head(%rip)
jmp .Lvyl_free_release
.Lvyl_free_scan:
cmpq $0, %rbx
je .Lvyl_free_done
movq (%rbx), %rax
cmpq %r12, %rax
je .Lvyl_free_unlink
movq %rax, %rbx
jmp .Lvyl_free_scan
.Lvyl_free_unlink:
movq (%r12), %rax
movq %rax, (%rbx)
.Lvyl_free_release:
movq %r12, %rdi
call free
.Lvyl_free_done:
movq $0, %rax
popq %r12
popq %rbx
leave
ret

.globl vyl_mark_ptr
vyl_mark_ptr:
pushq %rbp
movq %rsp, %rbp
cmpq $0, %rdi
je .Lvyl_mark_done
movq vyl_head(%rip), %rcx
.Lvyl_mark_loop:
cmpq $0, %rcx
je .Lvyl_mark_done
leaq 24(%rcx), %rax
cmpq %rax, %rdi
jb .Lvyl_mark_next
movq 8(%rcx), %rdx
addq %rax, %rdx
cmpq %rdx, %rdi
jae .Lvyl_mark_next
movq $1, 16(%rcx)
jmp .Lvyl_mark_done
.Lvyl_mark_next:
movq (%rcx), %rcx
jmp .Lvyl_mark_loop
.Lvyl_mark_done:
leave
ret

.globl vyl_collect
vyl_collect:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
subq $8, %rsp
movq stack_base(%rip), %r12
movq %rsp, %r13
.Lvyl_collect_scan:
cmpq %r12, %r13
jae .Lvyl_collect_scan_done
movq (%r13), %rdi
call vyl_mark_ptr
addq $8, %r13
jmp .Lvyl_collect_scan
.Lvyl_collect_scan_done:
movq vyl_head(%rip), %rbx
movq $0, %r12
.Lvyl_collect_sweep:
cmpq $0, %rbx
je .Lvyl_collect_done
movq 16(%rbx), %rax
cmpq $0, %rax
jne .Lvyl_collect_keep
movq (%rbx), %r13
cmpq $0, %r12
je .Lvyl_collect_head
movq %r13, (%r12)
jmp .Lvyl_collect_free
.Lvyl_collect_head:
movq %r13, vyl_head(%rip)
.Lvyl_collect_free:
movq %rbx, %rdi
call free
movq %r13, %rbx
jmp .Lvyl_collect_sweep
.Lvyl_collect_keep:
movq $0, 16(%rbx)
movq %rbx, %r12
movq (%rbx), %rbx
jmp .Lvyl_collect_sweep
.Lvyl_collect_done:
addq $8, %rsp
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_array
vyl_array:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
leaq 8(,%rdi,8), %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_array_done
movq %rbx, (%rax)
addq $8, %rax
movq %rax, %r12
movq %rax, %rdi
movq $0, %rsi
leaq 0(,%rbx,8), %rdx
call memset
movq %r12, %rax
.Lvyl_array_done:
popq %r12
popq %rbx
leave
ret

.globl vyl_bounds_fail
vyl_bounds_fail:
movq $60, %rax
movq $1, %rdi
syscall
"#
}

/// Terminal I/O: `print_int`, `print_string`, line input, and the
/// integer-to-string coercion buffer used by string concatenation.
pub fn io() -> &'static str {
    r#"
.globl print_int
print_int:
pushq %rbp
movq %rsp, %rbp
movq %rdi, %rsi
leaq .fmt_int(%rip), %rdi
movq $0, %rax
call printf
leave
ret

.globl print_string
print_string:
pushq %rbp
movq %rsp, %rbp
movq %rdi, %rsi
leaq .fmt_string(%rip), %rdi
movq $0, %rax
call printf
leave
ret

.globl vyl_int_to_str
vyl_int_to_str:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
movq $24, %rdi
call vyl_alloc
movq %rax, %r12
movq %rax, %rdi
leaq .fmt_ld(%rip), %rsi
movq %rbx, %rdx
movq $0, %rax
call sprintf
movq %r12, %rax
popq %r12
popq %rbx
leave
ret

.globl vyl_input
vyl_input:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
leaq input_buf(%rip), %rdi
movq $1024, %rsi
movq stdin(%rip), %rdx
call fgets
cmpq $0, %rax
je .Lvyl_input_empty
leaq input_buf(%rip), %rdi
call strlen
movq %rax, %rbx
cmpq $0, %rbx
je .Lvyl_input_copy
leaq input_buf(%rip), %rcx
movzbq -1(%rcx,%rbx,1), %rdx
cmpq $10, %rdx
jne .Lvyl_input_copy
decq %rbx
movb $0, (%rcx,%rbx,1)
.Lvyl_input_copy:
leaq 1(%rbx), %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_input_empty
movq %rax, %r12
movq %rax, %rdi
leaq input_buf(%rip), %rsi
call strcpy
movq %r12, %rax
jmp .Lvyl_input_done
.Lvyl_input_empty:
leaq .empty_str(%rip), %rax
.Lvyl_input_done:
popq %r12
popq %rbx
leave
ret
"#
}

/// File helpers: whole-file read into a tracked buffer, string write,
/// file-size probe, and directory-entry name extraction.
pub fn files() -> &'static str {
    r#"
.globl vyl_read_all
vyl_read_all:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
subq $8, %rsp
movq %rdi, %rbx
movq %rbx, %rdi
movq $0, %rsi
movq $2, %rdx
call fseek
movq %rbx, %rdi
call ftell
movq %rax, %r12
movq %rbx, %rdi
call rewind
cmpq $0, %r12
jle .Lvyl_read_all_zero
leaq 1(%r12), %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_read_all_zero
movq %rax, %r13
movq %r13, %rdi
movq $1, %rsi
movq %r12, %rdx
movq %rbx, %rcx
call fread
movb $0, (%r13,%r12,1)
movq %r13, %rax
jmp .Lvyl_read_all_done
.Lvyl_read_all_zero:
leaq .empty_str(%rip), %rax
.Lvyl_read_all_done:
addq $8, %rsp
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_write_all
vyl_write_all:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
movq %rsi, %r12
movq %r12, %rdi
call strlen
movq %r12, %rdi
movq $1, %rsi
movq %rax, %rdx
movq %rbx, %rcx
call fwrite
popq %r12
popq %rbx
leave
ret

.globl vyl_readfilesize
vyl_readfilesize:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
leaq .mode_rb(%rip), %rsi
call fopen
cmpq $0, %rax
je .Lvyl_readfilesize_zero
movq %rax, %rbx
movq %rbx, %rdi
movq $0, %rsi
movq $2, %rdx
call fseek
movq %rbx, %rdi
call ftell
movq %rax, %r12
movq %rbx, %rdi
call fclose
movq %r12, %rax
jmp .Lvyl_readfilesize_done
.Lvyl_readfilesize_zero:
movq $0, %rax
.Lvyl_readfilesize_done:
popq %r12
popq %rbx
leave
ret

.globl vyl_readdir
vyl_readdir:
pushq %rbp
movq %rsp, %rbp
call readdir
cmpq $0, %rax
je .Lvyl_readdir_empty
addq $19, %rax
jmp .Lvyl_readdir_done
.Lvyl_readdir_empty:
leaq .empty_str(%rip), %rax
.Lvyl_readdir_done:
leave
ret
"#
}

/// String helpers: concatenation, substring extraction, substring search,
/// and the null-safe environment lookup.
pub fn strings() -> &'static str {
    r#"
.globl vyl_strconcat
vyl_strconcat:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
pushq %r14
movq %rdi, %rbx
movq %rsi, %r13
movq %rbx, %rdi
call strlen
movq %rax, %r12
movq %r13, %rdi
call strlen
leaq 1(%r12,%rax), %rdi
call vyl_alloc
movq %rax, %r14
movq %r14, %rdi
movq %rbx, %rsi
call strcpy
movq %r14, %rdi
movq %r13, %rsi
call strcat
movq %r14, %rax
popq %r14
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_substring
vyl_substring:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
pushq %r14
movq %rdi, %rbx
movq %rsi, %r12
movq %rdx, %r13
leaq 1(%r13), %rdi
call vyl_alloc
movq %rax, %r14
movq %r14, %rdi
leaq (%rbx,%r12,1), %rsi
movq %r13, %rdx
call memcpy
movb $0, (%r14,%r13,1)
movq %r14, %rax
popq %r14
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_strfind
vyl_strfind:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
subq $8, %rsp
movq %rdi, %rbx
call strstr
cmpq $0, %rax
je .Lvyl_strfind_none
subq %rbx, %rax
jmp .Lvyl_strfind_done
.Lvyl_strfind_none:
movq $-1, %rax
.Lvyl_strfind_done:
addq $8, %rsp
popq %rbx
leave
ret

.globl vyl_getenv
vyl_getenv:
pushq %rbp
movq %rsp, %rbp
call getenv
cmpq $0, %rax
jne .Lvyl_getenv_done
leaq .empty_str(%rip), %rax
.Lvyl_getenv_done:
leave
ret
"#
}

/// Clock, sleep, integer square root, SHA-256 hex digest, and the
/// `system(3)`-backed filesystem conveniences.
pub fn misc() -> &'static str {
    r#"
.globl vyl_sleep
vyl_sleep:
pushq %rbp
movq %rsp, %rbp
subq $16, %rsp
movq %rdi, %rax
movq $1000, %rcx
cqto
idivq %rcx
movq %rax, -16(%rbp)
imulq $1000000, %rdx, %rdx
movq %rdx, -8(%rbp)
leaq -16(%rbp), %rdi
movq $0, %rsi
call nanosleep
movq $0, %rax
leave
ret

.globl vyl_now
vyl_now:
pushq %rbp
movq %rsp, %rbp
subq $16, %rsp
movq $0, %rdi
leaq -16(%rbp), %rsi
call clock_gettime
movq -8(%rbp), %rax
cqto
movq $1000000, %rcx
idivq %rcx
movq %rax, %rcx
movq -16(%rbp), %rax
imulq $1000, %rax, %rax
addq %rcx, %rax
leave
ret

.globl vyl_clock
vyl_clock:
pushq %rbp
movq %rsp, %rbp
subq $16, %rsp
movq $1, %rdi
leaq -16(%rbp), %rsi
call clock_gettime
movq -8(%rbp), %rax
cqto
movq $1000000, %rcx
idivq %rcx
movq %rax, %rcx
movq -16(%rbp), %rax
imulq $1000, %rax, %rax
addq %rcx, %rax
leave
ret

.globl vyl_sqrt
vyl_sqrt:
pushq %rbp
movq %rsp, %rbp
movq %rdi, %rcx
movq $0, %rax
cmpq $0, %rcx
jle .Lvyl_sqrt_done
.Lvyl_sqrt_loop:
leaq 1(%rax), %rdx
movq %rdx, %r8
imulq %rdx, %r8
cmpq %rcx, %r8
jg .Lvyl_sqrt_done
movq %rdx, %rax
jmp .Lvyl_sqrt_loop
.Lvyl_sqrt_done:
leave
ret

.globl vyl_sha256
vyl_sha256:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
call strlen
movq %rax, %r12
movq %rbx, %rdi
movq %r12, %rsi
leaq sha256_buf(%rip), %rdx
call SHA256
leaq sha256_buf(%rip), %rsi
leaq sha256_hex(%rip), %rdi
leaq hex_table(%rip), %r8
movq $0, %rcx
.Lvyl_sha256_hex:
cmpq $32, %rcx
jge .Lvyl_sha256_done
movzbl (%rsi,%rcx,1), %eax
movq %rax, %rbx
shrq $4, %rbx
andq $0xF, %rbx
movzbl (%r8,%rbx,1), %ebx
movb %bl, (%rdi,%rcx,2)
movzbl %al, %ebx
andq $0xF, %rbx
movzbl (%r8,%rbx,1), %ebx
movb %bl, 1(%rdi,%rcx,2)
incq %rcx
jmp .Lvyl_sha256_hex
.Lvyl_sha256_done:
movb $0, 64(%rdi)
leaq sha256_hex(%rip), %rax
popq %r12
popq %rbx
leave
ret

.globl vyl_mkdir_p
vyl_mkdir_p:
pushq %rbp
movq %rsp, %rbp
movq %rdi, %rcx
leaq cmd_buf(%rip), %rdi
movq $2304, %rsi
leaq .fmt_mkdir_p(%rip), %rdx
movq $0, %rax
call snprintf
leaq cmd_buf(%rip), %rdi
call system
leave
ret

.globl vyl_remove_all
vyl_remove_all:
pushq %rbp
movq %rsp, %rbp
movq %rdi, %rcx
leaq cmd_buf(%rip), %rdi
movq $2304, %rsi
leaq .fmt_rm_rf(%rip), %rdx
movq $0, %rax
call snprintf
leaq cmd_buf(%rip), %rdi
call system
leave
ret

.globl vyl_copy_file
vyl_copy_file:
pushq %rbp
movq %rsp, %rbp
movq %rsi, %r8
movq %rdi, %rcx
leaq cmd_buf(%rip), %rdi
movq $2304, %rsi
leaq .fmt_cp(%rip), %rdx
movq $0, %rax
call snprintf
leaq cmd_buf(%rip), %rdi
call system
leave
ret

.globl vyl_unzip
vyl_unzip:
pushq %rbp
movq %rsp, %rbp
movq %rsi, %r8
movq %rdi, %rcx
leaq cmd_buf(%rip), %rdi
movq $2304, %rsi
leaq .fmt_unzip(%rip), %rdx
movq $0, %rax
call snprintf
leaq cmd_buf(%rip), %rdi
call system
leave
ret
"#
}

/// POSIX socket plumbing: connect-by-name, send, sized receive into a
/// tracked buffer, close, and name resolution to dotted-quad text.
pub fn net() -> &'static str {
    r#"
.globl vyl_tcp_connect
vyl_tcp_connect:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
pushq %r14
movq %rdi, %rbx
movq %rsi, %r12
leaq portstr_buf(%rip), %rdi
movq $16, %rsi
leaq .fmt_ld(%rip), %rdx
movq %r12, %rcx
movq $0, %rax
call snprintf
leaq ai_hints(%rip), %rdi
movq $0, %rsi
movq $48, %rdx
call memset
leaq ai_hints(%rip), %rax
movl $2, 4(%rax)
movl $1, 8(%rax)
movq %rbx, %rdi
leaq portstr_buf(%rip), %rsi
leaq ai_hints(%rip), %rdx
leaq ai_result(%rip), %rcx
call getaddrinfo
cmpq $0, %rax
jne .Lvyl_tcp_connect_fail
movq ai_result(%rip), %r13
cmpq $0, %r13
je .Lvyl_tcp_connect_fail
movl 4(%r13), %edi
movl 8(%r13), %esi
movl 12(%r13), %edx
call socket
cmpq $0, %rax
jl .Lvyl_tcp_connect_free_fail
movq %rax, %r14
movq %r14, %rdi
movq 24(%r13), %rsi
movl 16(%r13), %edx
call connect
cmpq $0, %rax
jne .Lvyl_tcp_connect_close_fail
movq ai_result(%rip), %rdi
call freeaddrinfo
movq %r14, %rax
jmp .Lvyl_tcp_connect_done
.Lvyl_tcp_connect_close_fail:
movq %r14, %rdi
call close
.Lvyl_tcp_connect_free_fail:
movq ai_result(%rip), %rdi
call freeaddrinfo
.Lvyl_tcp_connect_fail:
movq $-1, %rax
.Lvyl_tcp_connect_done:
popq %r14
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_tcp_send
vyl_tcp_send:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
movq %rsi, %r12
movq %r12, %rdi
call strlen
movq %rbx, %rdi
movq %r12, %rsi
movq %rax, %rdx
movq $0, %rcx
call send
popq %r12
popq %rbx
leave
ret

.globl vyl_tcp_recv
vyl_tcp_recv:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
subq $8, %rsp
movq %rdi, %rbx
movq %rsi, %r12
leaq 1(%r12), %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_tcp_recv_empty
movq %rax, %r13
movq %rbx, %rdi
movq %r13, %rsi
movq %r12, %rdx
movq $0, %rcx
call recv
cmpq $0, %rax
jge .Lvyl_tcp_recv_store
movq $0, %rax
.Lvyl_tcp_recv_store:
movb $0, (%r13,%rax,1)
movq %r13, %rax
jmp .Lvyl_tcp_recv_done
.Lvyl_tcp_recv_empty:
leaq .empty_str(%rip), %rax
.Lvyl_tcp_recv_done:
addq $8, %rsp
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_tcp_close
vyl_tcp_close:
pushq %rbp
movq %rsp, %rbp
call close
leave
ret

.globl vyl_tcp_resolve
vyl_tcp_resolve:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
leaq ai_hints(%rip), %rdi
movq $0, %rsi
movq $48, %rdx
call memset
leaq ai_hints(%rip), %rax
movl $2, 4(%rax)
movl $1, 8(%rax)
movq %rbx, %rdi
movq $0, %rsi
leaq ai_hints(%rip), %rdx
leaq ai_result(%rip), %rcx
call getaddrinfo
cmpq $0, %rax
jne .Lvyl_tcp_resolve_empty
movq ai_result(%rip), %r12
cmpq $0, %r12
je .Lvyl_tcp_resolve_empty
movq 24(%r12), %rax
leaq 4(%rax), %rsi
movl $2, %edi
leaq resolve_buf(%rip), %rdx
movq $64, %rcx
call inet_ntop
movq ai_result(%rip), %rdi
call freeaddrinfo
leaq resolve_buf(%rip), %rax
jmp .Lvyl_tcp_resolve_done
.Lvyl_tcp_resolve_empty:
leaq .empty_str(%rip), %rax
.Lvyl_tcp_resolve_done:
popq %r12
popq %rbx
leave
ret
"#
}

/// TLS client plumbing over the TCP helpers, via OpenSSL.
pub fn tls() -> &'static str {
    r#"
.globl vyl_tls_connect
vyl_tls_connect:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
pushq %r14
movq %rdi, %rbx
movq %rsi, %r12
movq %rbx, %rdi
movq %r12, %rsi
call vyl_tcp_connect
cmpq $0, %rax
jl .Lvyl_tls_connect_fail
movq %rax, %r13
movq $0, %rdi
movq $0, %rsi
call OPENSSL_init_ssl
call TLS_client_method
movq %rax, %rdi
call SSL_CTX_new
cmpq $0, %rax
je .Lvyl_tls_connect_close
movq %rax, %rdi
call SSL_new
cmpq $0, %rax
je .Lvyl_tls_connect_close
movq %rax, %r14
movq %r14, %rdi
movl %r13d, %esi
call SSL_set_fd
movq %r14, %rdi
movq $55, %rsi
movq $0, %rdx
movq %rbx, %rcx
call SSL_ctrl
movq %r14, %rdi
call SSL_connect
cmpq $1, %rax
jne .Lvyl_tls_connect_ssl_fail
movq %r14, %rax
jmp .Lvyl_tls_connect_done
.Lvyl_tls_connect_ssl_fail:
movq %r14, %rdi
call SSL_free
.Lvyl_tls_connect_close:
movq %r13, %rdi
call close
.Lvyl_tls_connect_fail:
movq $-1, %rax
.Lvyl_tls_connect_done:
popq %r14
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_tls_send
vyl_tls_send:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
movq %rsi, %r12
movq %r12, %rdi
call strlen
movq %rbx, %rdi
movq %r12, %rsi
movl %eax, %edx
call SSL_write
popq %r12
popq %rbx
leave
ret

.globl vyl_tls_recv
vyl_tls_recv:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
subq $8, %rsp
movq %rdi, %rbx
movq %rsi, %r12
leaq 1(%r12), %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_tls_recv_empty
movq %rax, %r13
movq %rbx, %rdi
movq %r13, %rsi
movl %r12d, %edx
call SSL_read
cmpq $0, %rax
jge .Lvyl_tls_recv_store
movq $0, %rax
.Lvyl_tls_recv_store:
movb $0, (%r13,%rax,1)
movq %r13, %rax
jmp .Lvyl_tls_recv_done
.Lvyl_tls_recv_empty:
leaq .empty_str(%rip), %rax
.Lvyl_tls_recv_done:
addq $8, %rsp
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_tls_close
vyl_tls_close:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rdi, %rbx
call SSL_get_fd
movl %eax, %r12d
movq %rbx, %rdi
call SSL_shutdown
movq %rbx, %rdi
call SSL_free
movl %r12d, %edi
call close
movq $0, %rax
popq %r12
popq %rbx
leave
ret
"#
}

/// HTTP/1.0 client: request via `snprintf`, plain or TLS transport chosen
/// by port 443, response drained into a tracked buffer, redirects followed
/// up to five hops through the `Location` header.
pub fn http() -> &'static str {
    r#"
.globl vyl_http_get
vyl_http_get:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
pushq %r14
pushq %r15
subq $8, %rsp
movq %rdi, %rbx
movq %rsi, %r12
movq %rdx, %r13
movq $0, http_hops(%rip)
.Lvyl_http_get_hop:
leaq req_buf(%rip), %rdi
movq $2048, %rsi
leaq .fmt_http_req(%rip), %rdx
movq %r12, %rcx
movq %rbx, %r8
movq $0, %rax
call snprintf
cmpq $443, %r13
je .Lvyl_http_get_tls
movq %rbx, %rdi
movq %r13, %rsi
call vyl_tcp_connect
cmpq $0, %rax
jl .Lvyl_http_get_fail
movq %rax, %r14
movq %r14, %rdi
leaq req_buf(%rip), %rsi
call vyl_tcp_send
movq $1048576, %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_http_get_fail
movq %rax, %r15
movq $0, http_len(%rip)
.Lvyl_http_get_tcp_recv:
movq %r15, %rsi
addq http_len(%rip), %rsi
movq $1048575, %rdx
subq http_len(%rip), %rdx
cmpq $0, %rdx
jle .Lvyl_http_get_tcp_done
movq %r14, %rdi
movq $0, %rcx
call recv
cmpq $0, %rax
jle .Lvyl_http_get_tcp_done
addq %rax, http_len(%rip)
jmp .Lvyl_http_get_tcp_recv
.Lvyl_http_get_tcp_done:
movq %r14, %rdi
call vyl_tcp_close
jmp .Lvyl_http_get_parse
.Lvyl_http_get_tls:
movq %rbx, %rdi
movq %r13, %rsi
call vyl_tls_connect
cmpq $0, %rax
jl .Lvyl_http_get_fail
movq %rax, %r14
movq %r14, %rdi
leaq req_buf(%rip), %rsi
call vyl_tls_send
movq $1048576, %rdi
call vyl_alloc
cmpq $0, %rax
je .Lvyl_http_get_fail
movq %rax, %r15
movq $0, http_len(%rip)
.Lvyl_http_get_tls_recv:
movq %r15, %rsi
addq http_len(%rip), %rsi
movq $1048575, %rdx
subq http_len(%rip), %rdx
cmpq $0, %rdx
jle .Lvyl_http_get_tls_done
movq %r14, %rdi
call SSL_read
cmpq $0, %rax
jle .Lvyl_http_get_tls_done
addq %rax, http_len(%rip)
jmp .Lvyl_http_get_tls_recv
.Lvyl_http_get_tls_done:
movq %r14, %rdi
call vyl_tls_close
.Lvyl_http_get_parse:
movq http_len(%rip), %rax
movb $0, (%r15,%rax,1)
movzbq 9(%r15), %rax
cmpq $51, %rax
jne .Lvyl_http_get_body
movq http_hops(%rip), %rax
cmpq $5, %rax
jge .Lvyl_http_get_body
incq http_hops(%rip)
movq %r15, %rdi
leaq .str_location(%rip), %rsi
call strstr
cmpq $0, %rax
je .Lvyl_http_get_body
leaq 10(%rax), %rdi
movq %rbx, %rsi
call vyl_http_split_url
cmpq $0, %rax
je .Lvyl_http_get_keep_port
movq %rax, %r13
.Lvyl_http_get_keep_port:
leaq host_buf(%rip), %rbx
leaq path_buf(%rip), %r12
jmp .Lvyl_http_get_hop
.Lvyl_http_get_body:
movq %r15, %rdi
leaq .str_crlfcrlf(%rip), %rsi
call strstr
cmpq $0, %rax
je .Lvyl_http_get_whole
addq $4, %rax
jmp .Lvyl_http_get_done
.Lvyl_http_get_whole:
movq %r15, %rax
jmp .Lvyl_http_get_done
.Lvyl_http_get_fail:
leaq .empty_str(%rip), %rax
.Lvyl_http_get_done:
addq $8, %rsp
popq %r15
popq %r14
popq %r13
popq %r12
popq %rbx
leave
ret

vyl_http_split_url:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
pushq %r13
subq $8, %rsp
movq %rdi, %rbx
movq %rsi, %r12
movq $0, %r13
movq %rbx, %rdi
leaq .str_https(%rip), %rsi
movq $8, %rdx
call strncmp
cmpq $0, %rax
jne .Lvyl_split_check_http
addq $8, %rbx
movq $443, %r13
jmp .Lvyl_split_abs
.Lvyl_split_check_http:
movq %rbx, %rdi
leaq .str_http(%rip), %rsi
movq $7, %rdx
call strncmp
cmpq $0, %rax
jne .Lvyl_split_rel
addq $7, %rbx
movq $80, %r13
.Lvyl_split_abs:
leaq host_buf(%rip), %rdi
movq %rbx, %rsi
.Lvyl_split_abs_copy:
movzbq (%rsi), %rax
cmpq $47, %rax
je .Lvyl_split_abs_done
cmpq $13, %rax
je .Lvyl_split_abs_done
cmpq $10, %rax
je .Lvyl_split_abs_done
cmpq $0, %rax
je .Lvyl_split_abs_done
movb %al, (%rdi)
incq %rdi
incq %rsi
jmp .Lvyl_split_abs_copy
.Lvyl_split_abs_done:
movb $0, (%rdi)
movq %rsi, %rbx
jmp .Lvyl_split_path
.Lvyl_split_rel:
leaq host_buf(%rip), %rdi
movq %r12, %rsi
call strcpy
.Lvyl_split_path:
leaq path_buf(%rip), %rdi
movzbq (%rbx), %rax
cmpq $47, %rax
je .Lvyl_split_path_copy
movb $47, (%rdi)
incq %rdi
.Lvyl_split_path_copy:
movzbq (%rbx), %rax
cmpq $13, %rax
je .Lvyl_split_path_done
cmpq $10, %rax
je .Lvyl_split_path_done
cmpq $0, %rax
je .Lvyl_split_path_done
cmpq $32, %rax
je .Lvyl_split_path_done
movb %al, (%rdi)
incq %rdi
incq %rbx
jmp .Lvyl_split_path_copy
.Lvyl_split_path_done:
movb $0, (%rdi)
leaq path_buf(%rip), %rax
movzbq (%rax), %rcx
cmpq $0, %rcx
jne .Lvyl_split_ret
movb $47, (%rax)
movb $0, 1(%rax)
.Lvyl_split_ret:
movq %r13, %rax
addq $8, %rsp
popq %r13
popq %r12
popq %rbx
leave
ret

.globl vyl_http_download
vyl_http_download:
pushq %rbp
movq %rsp, %rbp
pushq %rbx
pushq %r12
movq %rcx, %rbx
call vyl_http_get
movq %rax, %r12
movq %rbx, %rdi
leaq .mode_wb(%rip), %rsi
call fopen
cmpq $0, %rax
je .Lvyl_http_download_fail
movq %rax, %rbx
movq %r12, %rdi
call strlen
movq %r12, %rdi
movq $1, %rsi
movq %rax, %rdx
movq %rbx, %rcx
call fwrite
movq %rbx, %rdi
call fclose
movq $0, %rax
jmp .Lvyl_http_download_done
.Lvyl_http_download_fail:
movq $-1, %rax
.Lvyl_http_download_done:
popq %r12
popq %rbx
leave
ret
"#
}

/// The runtime data section: printf formats, argc/argv and heap anchors,
/// hashing and network scratch buffers, and the `system(3)` command
/// templates.
pub fn data() -> &'static str {
    r#"
.section .data
.fmt_int: .asciz "%ld\n"
.fmt_string: .asciz "%s\n"
.fmt_ld: .asciz "%ld"
.empty_str: .asciz ""
.mode_rb: .asciz "rb"
.mode_wb: .asciz "wb"
argc_store: .quad 0
argv_store: .quad 0
vyl_head: .quad 0
stack_base: .quad 0
sha256_buf: .space 32
sha256_hex: .space 65
hex_table: .ascii "0123456789abcdef"
input_buf: .space 1024
portstr_buf: .space 16
ai_hints: .space 48
ai_result: .space 8
resolve_buf: .space 64
.fmt_http_req: .asciz "GET %s HTTP/1.0\r\nHost: %s\r\nConnection: close\r\n\r\n"
.str_location: .asciz "Location: "
.str_crlfcrlf: .asciz "\r\n\r\n"
.str_http: .asciz "http://"
.str_https: .asciz "https://"
http_hops: .quad 0
http_len: .quad 0
req_buf: .space 2048
host_buf: .space 512
path_buf: .space 1024
.fmt_mkdir_p: .asciz "mkdir -p '%s'"
.fmt_rm_rf: .asciz "rm -rf '%s'"
.fmt_cp: .asciz "cp '%s' '%s'"
.fmt_unzip: .asciz "unzip -o '%s' -d '%s'"
cmd_buf: .space 2304
"#
}
